use eframe::egui::{self, Color32, RichText};

use crate::models::{Listing, ListingStatus};

use super::super::state::DetailState;
use super::super::{format_price, format_timestamp, tasks, KerbsideApp, NavAction};

impl KerbsideApp {
    pub(crate) fn render_detail(&mut self, ui: &mut egui::Ui, state: &mut DetailState) {
        if ui.button("← Back to browse").clicked() {
            self.navigate(NavAction::Browse);
        }
        ui.separator();

        if state.is_loading {
            ui.add(egui::Spinner::new());
            return;
        }
        if let Some(err) = state.error.clone() {
            ui.colored_label(Color32::LIGHT_RED, err);
            if ui.button("Retry").clicked() {
                state.is_loading = true;
                state.error = None;
                self.spawn_load_detail(&state.listing_id);
            }
            return;
        }
        let Some(detail) = &state.detail else {
            return;
        };

        // Interactions are collected while the detail borrow is live and
        // applied afterwards.
        let mut toggle_favorite: Option<String> = None;
        let mut buy: Option<(String, String, f64)> = None;
        let mut edit_target: Option<Listing> = None;
        let mut open_similar: Option<Listing> = None;

        let listing = detail.listing.clone();
        let own_listing = self.current_user_id().as_deref() == Some(listing.seller_id.as_str());
        let is_favorite = self.favorite_ids.contains(&listing.id);

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading(&listing.title);
            ui.horizontal(|ui| {
                ui.label(RichText::new(format_price(listing.price)).strong().size(20.0));
                if let Some(original) = listing.original_price {
                    ui.label(RichText::new(format_price(original)).strikethrough().weak());
                }
                if listing.negotiable {
                    ui.label(RichText::new("negotiable").italics());
                }
                if listing.status == ListingStatus::Sold {
                    ui.colored_label(Color32::LIGHT_RED, "SOLD");
                }
            });
            ui.label(format!(
                "{} · {} · {}",
                listing.condition.label(),
                listing.category_name,
                listing.location
            ));
            ui.horizontal(|ui| {
                ui.label(format!("Listed {}", format_timestamp(&listing.created_at)));
                ui.label(format!("{} views", listing.view_count));
                ui.label(format!("♥ {}", listing.favorites_count));
            });

            egui::ScrollArea::horizontal().show(ui, |ui| {
                ui.horizontal(|ui| {
                    for image in &detail.images {
                        self.remote_image(ui, &image.url, 220.0);
                    }
                });
            });

            ui.horizontal(|ui| {
                let heart = if is_favorite { "♥ Saved" } else { "♡ Save" };
                if ui.button(heart).clicked() {
                    toggle_favorite = Some(listing.id.clone());
                }
                if listing.status == ListingStatus::Available && !own_listing {
                    if state.buying {
                        ui.add(egui::Spinner::new());
                        ui.label("Opening checkout…");
                    } else if ui
                        .button(RichText::new("Buy now").strong())
                        .clicked()
                    {
                        buy = Some((listing.id.clone(), listing.title.clone(), listing.price));
                    }
                }
                if own_listing && ui.button("Edit listing").clicked() {
                    edit_target = Some(listing.clone());
                }
            });

            if !listing.description.is_empty() {
                ui.separator();
                ui.label(&listing.description);
            }

            if !detail.specifications.is_empty() {
                ui.separator();
                ui.heading("Specifications");
                egui::Grid::new("spec-grid").striped(true).show(ui, |ui| {
                    for spec in &detail.specifications {
                        ui.label(RichText::new(&spec.name).strong());
                        ui.label(&spec.value);
                        ui.end_row();
                    }
                });
            }

            if !detail.similar.is_empty() {
                ui.separator();
                ui.heading("Similar items");
                for similar in &detail.similar {
                    ui.horizontal(|ui| {
                        if ui.button(&similar.title).clicked() {
                            open_similar = Some(similar.clone());
                        }
                        ui.label(format_price(similar.price));
                    });
                }
            }
        });

        if let Some(listing_id) = toggle_favorite {
            if self.require_sign_in("Sign in to save favorites") {
                if let Some(user_id) = self.current_user_id() {
                    let add = !self.favorite_ids.contains(&listing_id);
                    tasks::toggle_favorite(
                        self.api.clone(),
                        self.tx.clone(),
                        user_id,
                        listing_id,
                        add,
                    );
                }
            }
        }
        if let Some((listing_id, title, amount)) = buy {
            if self.require_sign_in("Sign in to buy") {
                if let Some(buyer_id) = self.current_user_id() {
                    state.buying = true;
                    tasks::start_checkout(
                        self.api.clone(),
                        self.tx.clone(),
                        listing_id,
                        title,
                        amount,
                        buyer_id,
                        self.config.checkout_url.clone(),
                    );
                }
            }
        }
        if let Some(listing) = edit_target {
            self.navigate(NavAction::SellEdit(Box::new(listing)));
        }
        if let Some(listing) = open_similar {
            self.navigate(NavAction::Detail(Box::new(listing)));
        }
    }
}
