use eframe::egui::{self, Color32, RichText};

use crate::catalog::{self, SortKey, ALL_CATEGORIES};
use crate::models::Listing;

use super::super::{format_price, format_timestamp, KerbsideApp, NavAction};

impl KerbsideApp {
    pub(crate) fn render_browse(&mut self, ui: &mut egui::Ui) {
        self.render_catalog_controls(ui);
        ui.separator();

        if self.listings_loading && self.listings.is_empty() {
            ui.add(egui::Spinner::new());
        }
        if let Some(err) = self.listings_error.clone() {
            ui.colored_label(Color32::LIGHT_RED, err);
            if ui.button("Retry").clicked() {
                self.spawn_load_listings();
            }
            ui.separator();
        }

        // Recomputed from the full array every frame; filters never stack on
        // a previously filtered result.
        let visible = catalog::filter_and_sort(&self.listings, &self.filter);

        egui::ScrollArea::vertical().show(ui, |ui| {
            if visible.is_empty() && !self.listings_loading {
                ui.label("Nothing matches. Try a different category or search.");
            }

            let mut open: Option<Listing> = None;
            for listing in &visible {
                self.listing_card(ui, listing, &mut open);
            }
            if let Some(listing) = open {
                self.navigate(NavAction::Detail(Box::new(listing)));
            }
        });
    }

    fn render_catalog_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("category-filter")
                .selected_text(self.filter.category.clone())
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut self.filter.category,
                        ALL_CATEGORIES.to_string(),
                        ALL_CATEGORIES,
                    );
                    for category in &self.categories {
                        if ui
                            .selectable_label(self.filter.category == category.name, &category.name)
                            .clicked()
                        {
                            self.filter.category = category.name.clone();
                        }
                    }
                });

            ui.label("Search");
            ui.text_edit_singleline(&mut self.filter.search);

            egui::ComboBox::from_id_salt("sort-key")
                .selected_text(self.filter.sort.label())
                .show_ui(ui, |ui| {
                    for sort in SortKey::ALL {
                        ui.selectable_value(&mut self.filter.sort, sort, sort.label());
                    }
                });

            if ui.button("Refresh").clicked() {
                self.spawn_load_listings();
            }
        });
    }

    fn listing_card(&mut self, ui: &mut egui::Ui, listing: &Listing, open: &mut Option<Listing>) {
        egui::Frame::group(ui.style())
            .fill(ui.visuals().extreme_bg_color)
            .inner_margin(egui::vec2(12.0, 8.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if let Some(url) = listing.primary_image_url() {
                        let url = url.to_string();
                        self.remote_image(ui, &url, 96.0);
                    }
                    ui.vertical(|ui| {
                        if ui
                            .button(RichText::new(&listing.title).strong())
                            .clicked()
                        {
                            *open = Some(listing.clone());
                        }
                        ui.horizontal(|ui| {
                            ui.label(RichText::new(format_price(listing.price)).strong());
                            if let Some(original) = listing.original_price {
                                ui.label(
                                    RichText::new(format_price(original)).strikethrough().weak(),
                                );
                            }
                            if listing.negotiable {
                                ui.label(RichText::new("negotiable").italics());
                            }
                        });
                        ui.label(format!(
                            "{} · {} · {}",
                            listing.condition.label(),
                            listing.category_name,
                            listing.location
                        ));
                        ui.horizontal(|ui| {
                            ui.label(format_timestamp(&listing.created_at));
                            ui.label(format!("♥ {}", listing.favorites_count));
                        });
                    });
                });
            });
    }
}
