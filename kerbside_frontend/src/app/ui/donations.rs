use eframe::egui::{self, Color32, RichText};

use crate::catalog::{self, ALL_CATEGORIES};
use crate::models::{Condition, DonationStatus, NewDonation};

use super::super::state::{DonationFormState, IntakeTarget};
use super::super::{format_timestamp, tasks, KerbsideApp, NavAction};

impl KerbsideApp {
    pub(crate) fn render_donations(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("donation-category")
                .selected_text(self.donation_category.clone())
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut self.donation_category,
                        ALL_CATEGORIES.to_string(),
                        ALL_CATEGORIES,
                    );
                    for category in &self.categories {
                        if ui
                            .selectable_label(self.donation_category == category.name, &category.name)
                            .clicked()
                        {
                            self.donation_category = category.name.clone();
                        }
                    }
                });
            ui.label("Search");
            ui.text_edit_singleline(&mut self.donation_search);
            if ui.button("Refresh").clicked() {
                self.spawn_load_donations();
            }
            if ui.button("Give an item").clicked() {
                self.navigate(NavAction::DonationForm);
            }
        });
        ui.separator();

        if self.donations_loading && self.donations.is_empty() {
            ui.add(egui::Spinner::new());
        }
        if let Some(err) = self.donations_error.clone() {
            ui.colored_label(Color32::LIGHT_RED, err);
            if ui.button("Retry").clicked() {
                self.spawn_load_donations();
            }
            ui.separator();
        }

        let visible = catalog::filter_donations(
            &self.donations,
            &self.donation_category,
            &self.donation_search,
        );

        let mut claim: Option<String> = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            if visible.is_empty() && !self.donations_loading {
                ui.label("No donations right now. Check back soon.");
            }
            for donation in &visible {
                egui::Frame::group(ui.style())
                    .fill(ui.visuals().extreme_bg_color)
                    .inner_margin(egui::vec2(12.0, 8.0))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            if let Some(url) = donation.image_url.clone() {
                                self.remote_image(ui, &url, 96.0);
                            }
                            ui.vertical(|ui| {
                                ui.label(RichText::new(&donation.item_name).strong());
                                ui.label(format!(
                                    "{} · {} · {}",
                                    donation.condition.label(),
                                    donation.category_name,
                                    donation.location
                                ));
                                if !donation.description.is_empty() {
                                    ui.label(&donation.description);
                                }
                                ui.horizontal(|ui| {
                                    ui.label(format_timestamp(&donation.created_at));
                                    match donation.status {
                                        DonationStatus::Available => {
                                            if ui.button("Claim").clicked() {
                                                claim = Some(donation.id.clone());
                                            }
                                        }
                                        DonationStatus::Claimed => {
                                            ui.colored_label(Color32::LIGHT_GREEN, "Claimed");
                                        }
                                    }
                                });
                            });
                        });
                    });
            }
        });

        if let Some(donation_id) = claim {
            if self.require_sign_in("Sign in to claim a donation") {
                tasks::claim_donation(self.api.clone(), self.tx.clone(), donation_id);
            }
        }
    }

    pub(crate) fn render_donation_form(&mut self, ui: &mut egui::Ui, form: &mut DonationFormState) {
        ui.heading("Give an item away");
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label("Item");
                ui.text_edit_singleline(&mut form.item_name);
            });
            ui.label("Description");
            ui.text_edit_multiline(&mut form.description);

            ui.horizontal(|ui| {
                ui.label("Category");
                let selected = if form.category_name.is_empty() {
                    "Choose a category".to_string()
                } else {
                    form.category_name.clone()
                };
                egui::ComboBox::from_id_salt("donation-form-category")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for category in &self.categories {
                            if ui
                                .selectable_label(form.category_id == category.id, &category.name)
                                .clicked()
                            {
                                form.category_id = category.id.clone();
                                form.category_name = category.name.clone();
                            }
                        }
                    });
                ui.label("Condition");
                egui::ComboBox::from_id_salt("donation-form-condition")
                    .selected_text(form.condition.label())
                    .show_ui(ui, |ui| {
                        for condition in Condition::ALL {
                            ui.selectable_value(&mut form.condition, condition, condition.label());
                        }
                    });
            });

            ui.horizontal(|ui| {
                ui.label("Your name");
                ui.text_edit_singleline(&mut form.contact_name);
                ui.label("Phone");
                ui.text_edit_singleline(&mut form.contact_phone);
            });
            ui.horizontal(|ui| {
                ui.label("Email");
                ui.text_edit_singleline(&mut form.contact_email);
                ui.label("Location");
                ui.text_edit_singleline(&mut form.location);
            });

            ui.separator();
            ui.label("Photo (optional)");
            if let Some(image) = form.intake.accepted.first() {
                let key = image.key.clone();
                let preview = image.preview.clone();
                let name = image.file_name.clone();
                ui.horizontal(|ui| {
                    self.preview_image(ui, &key, &preview, 96.0);
                    ui.label(name);
                    if ui.button("Remove").clicked() {
                        form.intake.accepted.clear();
                        self.drop_texture(&key);
                    }
                });
            }
            for (name, reason) in &form.intake.rejected {
                ui.colored_label(Color32::LIGHT_RED, format!("{name}: {reason}"));
            }
            ui.horizontal(|ui| {
                if form.intake.picking || form.intake.ingesting {
                    ui.add(egui::Spinner::new());
                } else if ui.button("Choose photo…").clicked() {
                    form.intake.picking = true;
                    tasks::pick_files(self.tx.clone(), IntakeTarget::DonationForm, false);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Or photo URL");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut form.url_slot.input)
                        .hint_text("https://…")
                        .desired_width(320.0),
                );
                if response.changed() {
                    let key = form.url_slot.texture_key(0);
                    form.url_slot.reset();
                    self.drop_texture(&key);
                }
                if form.url_slot.checking {
                    ui.add(egui::Spinner::new());
                } else if !form.url_slot.input.trim().is_empty() && ui.button("Check").clicked() {
                    form.url_slot.checking = true;
                    form.url_slot.error = None;
                    tasks::probe_url(
                        self.tx.clone(),
                        IntakeTarget::DonationForm,
                        0,
                        form.url_slot.revision,
                        form.url_slot.input.trim().to_string(),
                    );
                }
            });
            if let Some(err) = &form.url_slot.error {
                ui.colored_label(Color32::LIGHT_RED, err);
            } else if let Some(preview) = &form.url_slot.preview {
                let key = form.url_slot.texture_key(0);
                self.preview_image(ui, &key, preview, 96.0);
            }

            ui.separator();
            if let Some(err) = &form.error {
                ui.colored_label(Color32::LIGHT_RED, err);
            }
            if form.submitting {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Posting…");
                });
            } else if ui.button(RichText::new("Post donation").strong()).clicked() {
                self.spawn_submit_donation(form);
            }
        });
    }

    fn spawn_submit_donation(&mut self, form: &mut DonationFormState) {
        let item_name = form.item_name.trim().to_string();
        if item_name.is_empty() {
            form.error = Some("Name the item you are giving away".into());
            return;
        }
        if form.category_id.is_empty() {
            form.error = Some("Choose a category".into());
            return;
        }
        if form.contact_name.trim().is_empty() {
            form.error = Some("Add a contact name".into());
            return;
        }
        if form.contact_phone.trim().is_empty() && form.contact_email.trim().is_empty() {
            form.error = Some("Add a phone number or an email".into());
            return;
        }

        let donation = NewDonation {
            item_name,
            description: form.description.trim().to_string(),
            category_id: form.category_id.clone(),
            category_name: form.category_name.clone(),
            condition: form.condition,
            contact_name: form.contact_name.trim().to_string(),
            contact_phone: form.contact_phone.trim().to_string(),
            contact_email: form.contact_email.trim().to_string(),
            location: form.location.trim().to_string(),
            image_url: None,
            status: crate::models::DonationStatus::Available,
        };
        let image = form.intake.accepted.first().cloned();
        let image_url = if form.url_slot.is_valid() {
            Some(form.url_slot.input.trim().to_string())
        } else {
            None
        };

        form.error = None;
        form.submitting = true;
        tasks::submit_donation(self.api.clone(), self.tx.clone(), donation, image, image_url);
    }
}
