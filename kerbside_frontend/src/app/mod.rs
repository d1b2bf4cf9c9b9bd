use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::{DateTime, Utc};
use eframe::egui::{self, Context, TextureHandle};
use log::{error, warn};

use crate::api::ApiClient;
use crate::catalog::FilterState;
use crate::config::{self, AppConfig};
use crate::intake::Preview;
use crate::models::{Category, Donation, Listing, Profile, Session};

mod messages;
mod state;
mod tasks;
mod ui;

use messages::AppMessage;
use state::{
    AccountState, AdminState, AuthFormState, DetailState, DonationFormState, SellFormState,
    ViewState,
};

/// Cap on concurrent thumbnail downloads so a large catalog cannot flood the
/// network stack.
const MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Deferred navigation out of a render pass; applied once per frame after
/// the view borrow is released.
pub(crate) enum NavAction {
    Browse,
    Detail(Box<Listing>),
    SellNew,
    SellEdit(Box<Listing>),
    Donations,
    DonationForm,
    Account,
    Admin,
}

pub struct KerbsideApp {
    api: ApiClient,
    config: AppConfig,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,

    listings: Vec<Listing>,
    listings_loading: bool,
    listings_error: Option<String>,
    filter: FilterState,
    categories: Vec<Category>,

    donations: Vec<Donation>,
    donations_loading: bool,
    donations_error: Option<String>,
    donation_category: String,
    donation_search: String,

    view: ViewState,
    pending_nav: Option<NavAction>,
    show_auth: bool,
    auth: AuthFormState,
    profile: Option<Profile>,
    favorite_ids: HashSet<String>,
    info_banner: Option<String>,

    textures: HashMap<String, TextureHandle>,
    pending_previews: HashMap<String, Preview>,
    image_loading: HashSet<String>,
    image_errors: HashMap<String, String>,
    download_queue: VecDeque<(String, String)>,
    active_downloads: usize,
}

impl KerbsideApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::from_env();
        let api = ApiClient::new(&config).unwrap_or_else(|err| {
            error!("failed to initialise API client: {err}");
            ApiClient::new(&AppConfig {
                api_url: "http://127.0.0.1:54321".into(),
                api_key: String::new(),
                checkout_url: None,
            })
            .expect("fallback API client")
        });
        let (tx, rx) = mpsc::channel();

        let mut app = Self {
            api,
            config,
            tx,
            rx,
            listings: Vec::new(),
            listings_loading: false,
            listings_error: None,
            filter: FilterState::default(),
            categories: Vec::new(),
            donations: Vec::new(),
            donations_loading: false,
            donations_error: None,
            donation_category: crate::catalog::ALL_CATEGORIES.to_string(),
            donation_search: String::new(),
            view: ViewState::Browse,
            pending_nav: None,
            show_auth: false,
            auth: AuthFormState::default(),
            profile: None,
            favorite_ids: HashSet::new(),
            info_banner: None,
            textures: HashMap::new(),
            pending_previews: HashMap::new(),
            image_loading: HashSet::new(),
            image_errors: HashMap::new(),
            download_queue: VecDeque::new(),
            active_downloads: 0,
        };

        if let Some(session) = config::load_session(&config::session_path()) {
            app.restore_session(session);
        }
        app.spawn_load_listings();
        app.spawn_load_categories();
        app
    }

    // ---- session helpers ----

    fn restore_session(&mut self, session: Session) {
        let user_id = session.user.id.clone();
        self.api.set_session(Some(session));
        tasks::validate_session(self.api.clone(), self.tx.clone());
        tasks::load_profile(self.api.clone(), self.tx.clone(), user_id.clone());
        tasks::load_favorites_index(self.api.clone(), self.tx.clone(), user_id);
    }

    fn complete_sign_in(&mut self, session: Session) {
        if let Err(err) = config::store_session(&config::session_path(), Some(&session)) {
            warn!("failed to persist session: {err}");
        }
        self.info_banner = Some(format!("Signed in as {}", session.user.email));
        self.show_auth = false;
        self.auth = AuthFormState::default();
        self.restore_session(session);
    }

    pub(crate) fn signed_in(&self) -> bool {
        self.api.is_signed_in()
    }

    pub(crate) fn current_user_id(&self) -> Option<String> {
        self.api.current_user().map(|user| user.id)
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.profile
            .as_ref()
            .map(|profile| profile.is_admin)
            .unwrap_or(false)
    }

    // ---- spawn guards ----

    fn spawn_load_listings(&mut self) {
        if self.listings_loading {
            return;
        }
        self.listings_loading = true;
        self.listings_error = None;
        tasks::load_listings(self.api.clone(), self.tx.clone());
    }

    fn spawn_load_categories(&mut self) {
        tasks::load_categories(self.api.clone(), self.tx.clone());
    }

    fn spawn_load_detail(&mut self, listing_id: &str) {
        tasks::load_detail(self.api.clone(), self.tx.clone(), listing_id.to_string());
    }

    fn spawn_load_donations(&mut self) {
        if self.donations_loading {
            return;
        }
        self.donations_loading = true;
        self.donations_error = None;
        tasks::load_donations(self.api.clone(), self.tx.clone());
    }

    // ---- navigation ----

    pub(crate) fn navigate(&mut self, action: NavAction) {
        self.pending_nav = Some(action);
    }

    fn apply_pending_nav(&mut self) {
        let Some(action) = self.pending_nav.take() else {
            return;
        };
        match action {
            NavAction::Browse => {
                self.view = ViewState::Browse;
                self.spawn_load_listings();
            }
            NavAction::Detail(listing) => self.open_listing(&listing),
            NavAction::SellNew => self.open_sell_new(),
            NavAction::SellEdit(listing) => self.open_sell_edit(&listing),
            NavAction::Donations => {
                self.view = ViewState::Donations;
                self.spawn_load_donations();
            }
            NavAction::DonationForm => {
                if self.require_sign_in("Sign in to post a donation") {
                    self.view = ViewState::DonationForm(DonationFormState::new());
                }
            }
            NavAction::Account => self.open_account(),
            NavAction::Admin => self.open_admin(),
        }
    }

    /// Returns whether the user is signed in, prompting for auth otherwise.
    fn require_sign_in(&mut self, prompt: &str) -> bool {
        if self.signed_in() {
            true
        } else {
            self.show_auth = true;
            self.info_banner = Some(prompt.to_string());
            false
        }
    }

    pub(crate) fn open_listing(&mut self, listing: &Listing) {
        self.view = ViewState::Detail(DetailState::new(listing.id.clone()));
        self.spawn_load_detail(&listing.id);
    }

    fn open_sell_new(&mut self) {
        if !self.require_sign_in("Sign in to sell an item") {
            return;
        }
        if self.categories.is_empty() {
            self.spawn_load_categories();
        }
        self.view = ViewState::Sell(SellFormState::new());
    }

    fn open_sell_edit(&mut self, listing: &Listing) {
        if !self.require_sign_in("Sign in to edit a listing") {
            return;
        }
        if self.categories.is_empty() {
            self.spawn_load_categories();
        }
        self.view = ViewState::Sell(SellFormState::for_edit(listing));
        tasks::load_existing_listing(self.api.clone(), self.tx.clone(), listing.id.clone());
    }

    fn open_account(&mut self) {
        if !self.require_sign_in("Sign in to see your account") {
            return;
        }
        let Some(user_id) = self.current_user_id() else {
            return;
        };
        let mut account = AccountState::default();
        account.my_listings_loading = true;
        account.favorites_loading = true;
        self.view = ViewState::Account(account);
        tasks::load_my_listings(self.api.clone(), self.tx.clone(), user_id.clone());
        tasks::load_favorite_listings(self.api.clone(), self.tx.clone(), user_id);
    }

    fn open_admin(&mut self) {
        if !self.is_admin() {
            self.info_banner = Some("Admin review is restricted".into());
            return;
        }
        let mut admin = AdminState::default();
        admin.loading = true;
        self.view = ViewState::Admin(admin);
        tasks::load_pending_transactions(self.api.clone(), self.tx.clone());
        tasks::load_buckets(self.api.clone(), self.tx.clone());
    }

    // ---- image plumbing ----

    fn process_messages(&mut self) {
        messages::process_messages(self);
    }

    fn request_remote_image(&mut self, key: &str, url: &str) {
        self.image_loading.insert(key.to_string());
        self.download_queue
            .push_back((key.to_string(), url.to_string()));
        self.process_download_queue();
    }

    fn process_download_queue(&mut self) {
        while self.active_downloads < MAX_CONCURRENT_DOWNLOADS {
            if let Some((key, url)) = self.download_queue.pop_front() {
                self.active_downloads += 1;
                tasks::fetch_remote_image(self.tx.clone(), key, url);
            } else {
                break;
            }
        }
    }

    fn on_download_complete(&mut self) {
        if self.active_downloads > 0 {
            self.active_downloads -= 1;
        }
        self.process_download_queue();
    }

    /// Renders a remote image by URL: cached texture, pending decode, error,
    /// or spinner-plus-fetch on first sight.
    pub(crate) fn remote_image(&mut self, ui: &mut egui::Ui, url: &str, max_width: f32) {
        if let Some(texture) = self.textures.get(url) {
            show_scaled(ui, texture, max_width);
        } else if let Some(pending) = self.pending_previews.remove(url) {
            let color = egui::ColorImage::from_rgba_unmultiplied(pending.size, &pending.pixels);
            let texture = ui
                .ctx()
                .load_texture(url, color, egui::TextureOptions::default());
            self.textures.insert(url.to_string(), texture.clone());
            show_scaled(ui, &texture, max_width);
        } else if let Some(err) = self.image_errors.get(url) {
            ui.colored_label(egui::Color32::RED, format!("Image failed: {err}"));
        } else {
            ui.spinner();
            if !self.image_loading.contains(url) {
                self.request_remote_image(url, url);
            }
        }
    }

    /// Renders an already-decoded preview, loading its texture on first use.
    pub(crate) fn preview_image(
        &mut self,
        ui: &mut egui::Ui,
        key: &str,
        preview: &Preview,
        max_width: f32,
    ) {
        if !self.textures.contains_key(key) {
            let color = egui::ColorImage::from_rgba_unmultiplied(preview.size, &preview.pixels);
            let texture = ui
                .ctx()
                .load_texture(key, color, egui::TextureOptions::default());
            self.textures.insert(key.to_string(), texture);
        }
        if let Some(texture) = self.textures.get(key) {
            show_scaled(ui, texture, max_width);
        }
    }

    /// Releases the preview resource backing a removed image.
    pub(crate) fn drop_texture(&mut self, key: &str) {
        self.textures.remove(key);
    }

    fn any_background_work(&self) -> bool {
        if self.listings_loading || self.donations_loading || !self.image_loading.is_empty() {
            return true;
        }
        match &self.view {
            ViewState::Detail(state) => state.is_loading || state.buying,
            ViewState::Sell(form) => {
                form.submitting
                    || form.loading_existing
                    || form.intake.ingesting
                    || form.url_slots.iter().any(|slot| slot.checking)
            }
            ViewState::DonationForm(form) => {
                form.submitting || form.intake.ingesting || form.url_slot.checking
            }
            ViewState::Account(state) => {
                state.my_listings_loading
                    || state.favorites_loading
                    || state.profile_saving
                    || state.password_updating
            }
            ViewState::Admin(state) => state.loading || !state.acting.is_empty(),
            _ => self.auth.busy,
        }
    }

    fn render_top_bar(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Kerbside");
                ui.separator();
                if ui.button("Browse").clicked() {
                    self.navigate(NavAction::Browse);
                }
                if ui.button("Donations").clicked() {
                    self.navigate(NavAction::Donations);
                }
                if ui.button("Sell an item").clicked() {
                    self.navigate(NavAction::SellNew);
                }
                if ui.button("Account").clicked() {
                    self.navigate(NavAction::Account);
                }
                if self.is_admin() && ui.button("Admin").clicked() {
                    self.navigate(NavAction::Admin);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(user) = self.api.current_user() {
                        if ui.button("Sign out").clicked() {
                            tasks::sign_out(self.api.clone(), self.tx.clone());
                        }
                        ui.label(user.email);
                    } else if ui.button("Sign in").clicked() {
                        self.show_auth = true;
                    }
                });
            });

            if let Some(message) = self.info_banner.clone() {
                let mut dismiss = false;
                egui::Frame::group(ui.style())
                    .fill(ui.visuals().extreme_bg_color)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(message.as_str());
                            if ui.button("Dismiss").clicked() {
                                dismiss = true;
                            }
                        });
                    });
                if dismiss {
                    self.info_banner = None;
                }
            }
        });
    }
}

impl eframe::App for KerbsideApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.process_messages();
        self.render_top_bar(ctx);

        // The current view is moved out while rendering so screen code can
        // hold &mut state alongside &mut self.
        let mut view = std::mem::replace(&mut self.view, ViewState::Browse);
        egui::CentralPanel::default().show(ctx, |ui| match &mut view {
            ViewState::Browse => self.render_browse(ui),
            ViewState::Detail(state) => self.render_detail(ui, state),
            ViewState::Sell(form) => self.render_sell(ui, form),
            ViewState::Donations => self.render_donations(ui),
            ViewState::DonationForm(form) => self.render_donation_form(ui, form),
            ViewState::Account(state) => self.render_account(ui, state),
            ViewState::Admin(state) => self.render_admin(ui, state),
        });
        self.view = view;

        self.apply_pending_nav();
        self.render_auth_window(ctx);

        if self.any_background_work() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

fn show_scaled(ui: &mut egui::Ui, texture: &TextureHandle, max_width: f32) {
    let size = texture.size_vec2();
    let scale = if size.x > max_width {
        max_width / size.x
    } else {
        1.0
    };
    ui.add(egui::Image::from_texture(texture).fit_to_exact_size(size * scale));
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_price(price: f64) -> String {
    format!("${price:.2}")
}
