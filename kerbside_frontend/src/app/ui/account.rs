use eframe::egui::{self, Color32, RichText};

use crate::models::{Listing, ListingStatus, Profile};

use super::super::state::{AccountState, AccountTab};
use super::super::{format_price, tasks, KerbsideApp, NavAction};

enum ListingAction {
    Open(Listing),
    Edit(Listing),
    MarkSold(String),
    Delete(String),
    Unfavorite(String),
}

impl KerbsideApp {
    pub(crate) fn render_account(&mut self, ui: &mut egui::Ui, state: &mut AccountState) {
        if !state.inputs_initialized {
            if let Some(profile) = &self.profile {
                state.display_name = profile.display_name.clone();
                state.phone = profile.phone.clone();
                state.location = profile.location.clone();
                state.inputs_initialized = true;
            }
        }

        ui.horizontal(|ui| {
            if ui
                .selectable_label(state.tab == AccountTab::MyListings, "My listings")
                .clicked()
            {
                state.tab = AccountTab::MyListings;
            }
            if ui
                .selectable_label(state.tab == AccountTab::Favorites, "Favorites")
                .clicked()
            {
                state.tab = AccountTab::Favorites;
            }
            if ui
                .selectable_label(state.tab == AccountTab::Profile, "Profile")
                .clicked()
            {
                state.tab = AccountTab::Profile;
            }
        });
        ui.separator();

        let mut action: Option<ListingAction> = None;
        match state.tab {
            AccountTab::MyListings => self.render_my_listings(ui, state, &mut action),
            AccountTab::Favorites => self.render_favorites(ui, state, &mut action),
            AccountTab::Profile => self.render_profile(ui, state),
        }

        match action {
            Some(ListingAction::Open(listing)) => {
                self.navigate(NavAction::Detail(Box::new(listing)));
            }
            Some(ListingAction::Edit(listing)) => {
                self.navigate(NavAction::SellEdit(Box::new(listing)));
            }
            Some(ListingAction::MarkSold(listing_id)) => {
                tasks::mark_listing_sold(self.api.clone(), self.tx.clone(), listing_id);
            }
            Some(ListingAction::Delete(listing_id)) => {
                tasks::delete_listing(self.api.clone(), self.tx.clone(), listing_id);
            }
            Some(ListingAction::Unfavorite(listing_id)) => {
                if let Some(user_id) = self.current_user_id() {
                    state.favorites.retain(|listing| listing.id != listing_id);
                    tasks::toggle_favorite(
                        self.api.clone(),
                        self.tx.clone(),
                        user_id,
                        listing_id,
                        false,
                    );
                }
            }
            None => {}
        }
    }

    fn render_my_listings(
        &mut self,
        ui: &mut egui::Ui,
        state: &mut AccountState,
        action: &mut Option<ListingAction>,
    ) {
        if state.my_listings_loading {
            ui.add(egui::Spinner::new());
        }
        if let Some(err) = &state.my_listings_error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
        egui::ScrollArea::vertical().show(ui, |ui| {
            if state.my_listings.is_empty() && !state.my_listings_loading {
                ui.label("You have not listed anything yet.");
            }
            for listing in &state.my_listings {
                ui.horizontal(|ui| {
                    if ui.button(&listing.title).clicked() {
                        *action = Some(ListingAction::Open(listing.clone()));
                    }
                    ui.label(format_price(listing.price));
                    match listing.status {
                        ListingStatus::Available => {
                            ui.label("available");
                            if ui.button("Edit").clicked() {
                                *action = Some(ListingAction::Edit(listing.clone()));
                            }
                            if ui.button("Mark sold").clicked() {
                                *action = Some(ListingAction::MarkSold(listing.id.clone()));
                            }
                        }
                        ListingStatus::Sold => {
                            ui.colored_label(Color32::LIGHT_RED, "sold");
                        }
                    }
                    if ui.button("Delete").clicked() {
                        *action = Some(ListingAction::Delete(listing.id.clone()));
                    }
                });
            }
        });
    }

    fn render_favorites(
        &mut self,
        ui: &mut egui::Ui,
        state: &mut AccountState,
        action: &mut Option<ListingAction>,
    ) {
        if state.favorites_loading {
            ui.add(egui::Spinner::new());
        }
        if let Some(err) = &state.favorites_error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
        egui::ScrollArea::vertical().show(ui, |ui| {
            if state.favorites.is_empty() && !state.favorites_loading {
                ui.label("No saved items yet. Tap ♡ on a listing to keep it here.");
            }
            for listing in &state.favorites {
                ui.horizontal(|ui| {
                    if ui.button(&listing.title).clicked() {
                        *action = Some(ListingAction::Open(listing.clone()));
                    }
                    ui.label(format_price(listing.price));
                    ui.label(&listing.category_name);
                    if ui.button("Remove").clicked() {
                        *action = Some(ListingAction::Unfavorite(listing.id.clone()));
                    }
                });
            }
        });
    }

    fn render_profile(&mut self, ui: &mut egui::Ui, state: &mut AccountState) {
        ui.horizontal(|ui| {
            ui.label("Display name");
            ui.text_edit_singleline(&mut state.display_name);
        });
        ui.horizontal(|ui| {
            ui.label("Phone");
            ui.text_edit_singleline(&mut state.phone);
        });
        ui.horizontal(|ui| {
            ui.label("Location");
            ui.text_edit_singleline(&mut state.location);
        });
        if let Some(err) = &state.profile_error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
        if state.profile_saving {
            ui.add(egui::Spinner::new());
        } else if ui.button("Save profile").clicked() {
            if let Some(user_id) = self.current_user_id() {
                state.profile_saving = true;
                state.profile_error = None;
                let profile = Profile {
                    id: user_id,
                    display_name: state.display_name.trim().to_string(),
                    phone: state.phone.trim().to_string(),
                    location: state.location.trim().to_string(),
                    is_admin: self.is_admin(),
                };
                tasks::save_profile(self.api.clone(), self.tx.clone(), profile);
            }
        }

        ui.separator();
        ui.label(RichText::new("Change password").strong());
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut state.new_password).password(true));
            if state.password_updating {
                ui.add(egui::Spinner::new());
            } else if ui.button("Update password").clicked() {
                if state.new_password.len() < 8 {
                    state.password_notice =
                        Some("Password needs at least 8 characters".into());
                } else {
                    state.password_updating = true;
                    state.password_notice = None;
                    tasks::update_password(
                        self.api.clone(),
                        self.tx.clone(),
                        state.new_password.clone(),
                    );
                }
            }
        });
        if let Some(notice) = &state.password_notice {
            ui.label(notice);
        }
    }
}
