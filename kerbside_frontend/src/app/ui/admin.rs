use eframe::egui::{self, Color32, RichText};

use super::super::state::AdminState;
use super::super::{format_price, format_timestamp, tasks, KerbsideApp};

impl KerbsideApp {
    pub(crate) fn render_admin(&mut self, ui: &mut egui::Ui, state: &mut AdminState) {
        ui.horizontal(|ui| {
            ui.heading("Payment review");
            if ui.button("Refresh").clicked() && !state.loading {
                state.loading = true;
                state.error = None;
                tasks::load_pending_transactions(self.api.clone(), self.tx.clone());
            }
        });
        if let Some(note) = &state.storage_note {
            ui.label(RichText::new(note).weak());
        }
        ui.separator();

        if state.loading {
            ui.add(egui::Spinner::new());
        }
        if let Some(err) = &state.error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }
        if state.transactions.is_empty() && !state.loading {
            ui.label("No pending transactions.");
            return;
        }

        let mut review: Option<(String, String, bool)> = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("transaction-grid")
                .striped(true)
                .num_columns(6)
                .show(ui, |ui| {
                    ui.label(RichText::new("Created").strong());
                    ui.label(RichText::new("Listing").strong());
                    ui.label(RichText::new("Amount").strong());
                    ui.label(RichText::new("Order ref").strong());
                    ui.label("");
                    ui.label("");
                    ui.end_row();

                    for transaction in &state.transactions {
                        ui.label(format_timestamp(&transaction.created_at));
                        ui.label(&transaction.listing_title);
                        ui.label(format_price(transaction.amount));
                        ui.label(RichText::new(&transaction.provider_order_id).monospace());
                        if state.acting.contains(&transaction.id) {
                            ui.add(egui::Spinner::new());
                            ui.label("");
                        } else {
                            if ui.button("Approve").clicked() {
                                review = Some((
                                    transaction.id.clone(),
                                    transaction.listing_id.clone(),
                                    true,
                                ));
                            }
                            if ui.button("Reject").clicked() {
                                review = Some((
                                    transaction.id.clone(),
                                    transaction.listing_id.clone(),
                                    false,
                                ));
                            }
                        }
                        ui.end_row();
                    }
                });
        });

        if let Some((transaction_id, listing_id, approve)) = review {
            state.acting.insert(transaction_id.clone());
            tasks::review_transaction(
                self.api.clone(),
                self.tx.clone(),
                transaction_id,
                listing_id,
                approve,
            );
        }
    }
}
