use eframe::egui::{self, Color32, Context};
use log::warn;
use serde_json::json;

use super::super::state::AuthMode;
use super::super::{tasks, KerbsideApp};

impl KerbsideApp {
    pub(crate) fn render_auth_window(&mut self, ctx: &Context) {
        if !self.show_auth {
            return;
        }
        let mut open = true;
        egui::Window::new("Account")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(self.auth.mode == AuthMode::SignIn, "Sign in")
                        .clicked()
                    {
                        self.auth.mode = AuthMode::SignIn;
                    }
                    if ui
                        .selectable_label(self.auth.mode == AuthMode::SignUp, "Create account")
                        .clicked()
                    {
                        self.auth.mode = AuthMode::SignUp;
                    }
                    if ui
                        .selectable_label(self.auth.mode == AuthMode::Reset, "Forgot password")
                        .clicked()
                    {
                        self.auth.mode = AuthMode::Reset;
                    }
                });
                ui.separator();

                ui.horizontal(|ui| {
                    ui.label("Email");
                    ui.text_edit_singleline(&mut self.auth.email);
                });
                if self.auth.mode != AuthMode::Reset {
                    ui.horizontal(|ui| {
                        ui.label("Password");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.auth.password).password(true),
                        );
                    });
                }
                if self.auth.mode == AuthMode::SignUp {
                    ui.horizontal(|ui| {
                        ui.label("Display name");
                        ui.text_edit_singleline(&mut self.auth.display_name);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Phone");
                        ui.text_edit_singleline(&mut self.auth.phone);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Location");
                        ui.text_edit_singleline(&mut self.auth.location);
                    });
                }

                if let Some(notice) = &self.auth.notice {
                    ui.colored_label(Color32::LIGHT_GREEN, notice);
                }
                if let Some(err) = &self.auth.error {
                    ui.colored_label(Color32::LIGHT_RED, err);
                }

                if self.auth.busy {
                    ui.add(egui::Spinner::new());
                    return;
                }

                match self.auth.mode {
                    AuthMode::SignIn => {
                        ui.horizontal(|ui| {
                            if ui.button("Sign in").clicked() {
                                self.spawn_sign_in();
                            }
                            if ui.button("Continue with Google").clicked() {
                                let url = self.api.oauth_authorize_url("google");
                                if let Err(err) = open::that(&url) {
                                    warn!("could not open browser: {err}");
                                }
                                self.info_banner =
                                    Some("Continue signing in from your browser".into());
                            }
                        });
                    }
                    AuthMode::SignUp => {
                        if ui.button("Create account").clicked() {
                            self.spawn_sign_up();
                        }
                    }
                    AuthMode::Reset => {
                        if ui.button("Send reset email").clicked() {
                            self.spawn_password_reset();
                        }
                    }
                }
            });
        if !open {
            self.show_auth = false;
        }
    }

    fn spawn_sign_in(&mut self) {
        let email = self.auth.email.trim().to_string();
        if email.is_empty() || self.auth.password.is_empty() {
            self.auth.error = Some("Enter your email and password".into());
            return;
        }
        self.auth.error = None;
        self.auth.notice = None;
        self.auth.busy = true;
        tasks::sign_in(
            self.api.clone(),
            self.tx.clone(),
            email,
            self.auth.password.clone(),
        );
    }

    fn spawn_sign_up(&mut self) {
        let email = self.auth.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            self.auth.error = Some("Enter a valid email".into());
            return;
        }
        if self.auth.password.len() < 8 {
            self.auth.error = Some("Password needs at least 8 characters".into());
            return;
        }
        let profile_fields = json!({
            "display_name": self.auth.display_name.trim(),
            "phone": self.auth.phone.trim(),
            "location": self.auth.location.trim(),
        });
        self.auth.error = None;
        self.auth.notice = None;
        self.auth.busy = true;
        tasks::sign_up(
            self.api.clone(),
            self.tx.clone(),
            email,
            self.auth.password.clone(),
            profile_fields,
        );
    }

    fn spawn_password_reset(&mut self) {
        let email = self.auth.email.trim().to_string();
        if email.is_empty() {
            self.auth.error = Some("Enter the email you signed up with".into());
            return;
        }
        self.auth.error = None;
        self.auth.notice = None;
        self.auth.busy = true;
        tasks::request_password_reset(self.api.clone(), self.tx.clone(), email);
    }
}
