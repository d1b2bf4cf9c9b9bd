use eframe::egui::{self, Color32, RichText};

use crate::models::{Condition, ListingStatus, NewListing};
use crate::pipeline::{ImagePlan, ListingSubmission};

use super::super::state::{IntakeTarget, SellFormState};
use super::super::{tasks, KerbsideApp};

impl KerbsideApp {
    pub(crate) fn render_sell(&mut self, ui: &mut egui::Ui, form: &mut SellFormState) {
        let editing = form.listing_id.is_some();
        ui.heading(if editing { "Edit listing" } else { "New listing" });
        if form.loading_existing {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label("Loading current photos and specifications…");
            });
        }
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            self.render_listing_fields(ui, form);
            ui.separator();
            self.render_photo_section(ui, form);
            ui.separator();
            self.render_spec_section(ui, form);
            ui.separator();

            if let Some(err) = &form.error {
                ui.colored_label(Color32::LIGHT_RED, err);
            }
            if form.submitting {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Publishing…");
                });
            } else {
                let label = if editing { "Save changes" } else { "Publish listing" };
                if ui.button(RichText::new(label).strong()).clicked() {
                    self.spawn_submit_listing(form);
                }
            }
        });
    }

    fn render_listing_fields(&mut self, ui: &mut egui::Ui, form: &mut SellFormState) {
        ui.horizontal(|ui| {
            ui.label("Title");
            ui.text_edit_singleline(&mut form.title);
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
            egui::ComboBox::from_id_salt("listing-category")
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
            egui::ComboBox::from_id_salt("listing-condition")
                .selected_text(form.condition.label())
                .show_ui(ui, |ui| {
                    for condition in Condition::ALL {
                        ui.selectable_value(&mut form.condition, condition, condition.label());
                    }
                });
        });

        ui.horizontal(|ui| {
            ui.label("Price");
            ui.add(egui::TextEdit::singleline(&mut form.price).desired_width(80.0));
            ui.label("Original price (optional)");
            ui.add(egui::TextEdit::singleline(&mut form.original_price).desired_width(80.0));
            ui.checkbox(&mut form.negotiable, "Open to offers");
        });

        ui.horizontal(|ui| {
            ui.label("Location");
            ui.text_edit_singleline(&mut form.location);
        });
    }

    fn render_photo_section(&mut self, ui: &mut egui::Ui, form: &mut SellFormState) {
        ui.heading("Photos");
        ui.label("The first photo becomes the cover image.");

        if !form.existing.is_empty() {
            ui.label("Current photos");
            for (image, keep) in form.existing.iter_mut() {
                ui.horizontal(|ui| {
                    self.remote_image(ui, &image.url, 96.0);
                    ui.checkbox(keep, "keep");
                });
            }
        }

        let mut remove_index = None;
        for (index, image) in form.intake.accepted.iter().enumerate() {
            ui.horizontal(|ui| {
                self.preview_image(ui, &image.key, &image.preview, 96.0);
                ui.label(&image.file_name);
                ui.label(format!("{:.1} KB", image.bytes.len() as f64 / 1024.0));
                if ui.button("Remove").clicked() {
                    remove_index = Some(index);
                }
            });
        }
        if let Some(index) = remove_index {
            let removed = form.intake.accepted.remove(index);
            // Frees the preview texture along with the file reference.
            self.drop_texture(&removed.key);
        }

        if !form.intake.rejected.is_empty() {
            for (name, reason) in &form.intake.rejected {
                ui.colored_label(Color32::LIGHT_RED, format!("{name}: {reason}"));
            }
            if ui.button("Clear errors").clicked() {
                form.intake.rejected.clear();
            }
        }

        ui.horizontal(|ui| {
            if form.intake.picking || form.intake.ingesting {
                ui.add(egui::Spinner::new());
            } else if ui.button("Add photos…").clicked() {
                form.intake.picking = true;
                tasks::pick_files(self.tx.clone(), IntakeTarget::SellForm, true);
            }
        });

        ui.add_space(6.0);
        ui.label("Or link photos hosted elsewhere");
        let mut remove_slot = None;
        for index in 0..form.url_slots.len() {
            let tx = self.tx.clone();
            let slot_count = form.url_slots.len();
            let slot = &mut form.url_slots[index];
            let mut dropped_texture = None;
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut slot.input)
                        .hint_text("https://…")
                        .desired_width(320.0),
                );
                if response.changed() {
                    // Editing (or emptying) the field clears prior results and
                    // invalidates any probe still in flight.
                    dropped_texture = Some(slot.texture_key(index));
                    slot.reset();
                }
                if slot.checking {
                    ui.add(egui::Spinner::new());
                } else if !slot.input.trim().is_empty() && ui.button("Check").clicked() {
                    slot.checking = true;
                    slot.error = None;
                    tasks::probe_url(
                        tx,
                        IntakeTarget::SellForm,
                        index,
                        slot.revision,
                        slot.input.trim().to_string(),
                    );
                }
                if slot_count > 1 && ui.button("✕").clicked() {
                    remove_slot = Some(index);
                }
            });
            if let Some(key) = dropped_texture {
                self.drop_texture(&key);
            }
            if let Some(err) = &slot.error {
                ui.colored_label(Color32::LIGHT_RED, err);
            } else if let Some(preview) = &slot.preview {
                let key = slot.texture_key(index);
                self.preview_image(ui, &key, preview, 96.0);
            }
        }
        if let Some(index) = remove_slot {
            let slot = form.url_slots.remove(index);
            self.drop_texture(&slot.texture_key(index));
        }
        if ui.button("Add another URL").clicked() {
            form.url_slots.push(Default::default());
        }
    }

    fn render_spec_section(&mut self, ui: &mut egui::Ui, form: &mut SellFormState) {
        ui.heading("Specifications");
        ui.label("Optional details like brand, size, or model. Blank rows are skipped.");

        let mut remove_index = None;
        for index in 0..form.specs.len() {
            if let Some(pair) = form.specs.pair_mut(index) {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut pair.name)
                            .hint_text("Name")
                            .desired_width(140.0),
                    );
                    ui.add(
                        egui::TextEdit::singleline(&mut pair.value)
                            .hint_text("Value")
                            .desired_width(220.0),
                    );
                    if ui.button("✕").clicked() {
                        remove_index = Some(index);
                    }
                });
            }
        }
        if let Some(index) = remove_index {
            form.specs.remove(index);
        }
        if ui.button("Add specification").clicked() {
            form.specs.append_blank();
        }
    }

    fn spawn_submit_listing(&mut self, form: &mut SellFormState) {
        let title = form.title.trim().to_string();
        if title.is_empty() {
            form.error = Some("Title cannot be empty".into());
            return;
        }
        if form.category_id.is_empty() {
            form.error = Some("Choose a category".into());
            return;
        }
        let price: f64 = match form.price.trim().parse() {
            Ok(price) if price >= 0.0 => price,
            _ => {
                form.error = Some("Enter a valid price".into());
                return;
            }
        };
        let original_price = if form.original_price.trim().is_empty() {
            None
        } else {
            match form.original_price.trim().parse::<f64>() {
                Ok(original) if original >= 0.0 => Some(original),
                _ => {
                    form.error = Some("Enter a valid original price".into());
                    return;
                }
            }
        };
        let Some(seller_id) = self.current_user_id() else {
            form.error = Some("Sign in before publishing".into());
            return;
        };

        let plan = ImagePlan {
            kept: form.kept_images(),
            files: form.intake.accepted.clone(),
            urls: form.valid_urls(),
        };
        if plan.is_empty() {
            form.error = Some("Add at least one photo".into());
            return;
        }

        let fields = NewListing {
            title,
            description: form.description.trim().to_string(),
            category_id: form.category_id.clone(),
            category_name: form.category_name.clone(),
            price,
            original_price,
            condition: form.condition,
            negotiable: form.negotiable,
            location: form.location.trim().to_string(),
            status: ListingStatus::Available,
            seller_id,
        };

        form.error = None;
        form.submitting = true;
        tasks::submit_listing(
            self.api.clone(),
            self.tx.clone(),
            ListingSubmission {
                listing_id: form.listing_id.clone(),
                fields,
                plan,
                specifications: form.specs.cleaned(),
            },
        );
    }
}
