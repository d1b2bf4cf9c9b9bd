use std::collections::HashSet;
use std::path::PathBuf;

use log::{error, warn};

use crate::api::Bucket;
use crate::config;
use crate::detail::ListingDetail;
use crate::intake::{AcceptedImage, Preview};
use crate::models::{
    Category, Donation, Favorite, Listing, ListingImage, Profile, Session, Specification,
    Transaction,
};

use super::state::{DetailState, IntakeTarget, ViewState};
use super::{tasks, KerbsideApp};

pub enum AppMessage {
    ListingsLoaded(Result<Vec<Listing>, anyhow::Error>),
    CategoriesLoaded(Result<Vec<Category>, anyhow::Error>),
    DetailLoaded {
        listing_id: String,
        result: Result<ListingDetail, anyhow::Error>,
    },
    RemoteImageLoaded {
        key: String,
        result: Result<Preview, String>,
    },
    FilesPicked {
        target: IntakeTarget,
        paths: Vec<PathBuf>,
    },
    FilesIngested {
        target: IntakeTarget,
        accepted: Vec<AcceptedImage>,
        rejected: Vec<(String, String)>,
    },
    UrlProbeFinished {
        target: IntakeTarget,
        slot: usize,
        revision: u64,
        result: Result<Preview, String>,
    },
    ExistingListingLoaded {
        listing_id: String,
        result: Result<(Vec<ListingImage>, Vec<Specification>), anyhow::Error>,
    },
    ListingSubmitted(Result<Listing, anyhow::Error>),
    ListingDeleted {
        listing_id: String,
        result: Result<(), anyhow::Error>,
    },
    ListingMarkedSold {
        listing_id: String,
        result: Result<(), anyhow::Error>,
    },
    DonationsLoaded(Result<Vec<Donation>, anyhow::Error>),
    DonationSubmitted(Result<Donation, anyhow::Error>),
    DonationClaimed {
        donation_id: String,
        result: Result<(), anyhow::Error>,
    },
    FavoritesIndexLoaded(Result<Vec<Favorite>, anyhow::Error>),
    FavoriteToggled {
        listing_id: String,
        now_favorite: bool,
        result: Result<(), anyhow::Error>,
    },
    FavoriteListingsLoaded(Result<Vec<Listing>, anyhow::Error>),
    MyListingsLoaded(Result<Vec<Listing>, anyhow::Error>),
    SessionValidated(Result<crate::models::AuthUser, anyhow::Error>),
    SignedIn(Result<Session, anyhow::Error>),
    SignedUp(Result<Option<Session>, anyhow::Error>),
    SignedOut(Result<(), anyhow::Error>),
    PasswordResetRequested(Result<(), anyhow::Error>),
    PasswordUpdated(Result<(), anyhow::Error>),
    ProfileLoaded(Result<Option<Profile>, anyhow::Error>),
    ProfileSaved {
        result: Result<(), anyhow::Error>,
        profile: Profile,
    },
    TransactionsLoaded(Result<Vec<Transaction>, anyhow::Error>),
    TransactionReviewed {
        transaction_id: String,
        result: Result<(), anyhow::Error>,
    },
    CheckoutStarted {
        listing_id: String,
        result: Result<Transaction, anyhow::Error>,
    },
    BucketsLoaded(Result<Vec<Bucket>, anyhow::Error>),
}

pub(super) fn process_messages(app: &mut KerbsideApp) {
    while let Ok(message) = app.rx.try_recv() {
        match message {
            AppMessage::ListingsLoaded(result) => {
                app.listings_loading = false;
                match result {
                    Ok(listings) => {
                        app.listings = listings;
                        app.listings_error = None;
                    }
                    Err(err) => {
                        app.listings_error = Some(err.to_string());
                    }
                }
            }
            AppMessage::CategoriesLoaded(result) => match result {
                Ok(categories) => app.categories = categories,
                Err(err) => error!("failed to load categories: {err}"),
            },
            AppMessage::DetailLoaded { listing_id, result } => {
                if let ViewState::Detail(state) = &mut app.view {
                    if state.listing_id == listing_id {
                        state.is_loading = false;
                        match result {
                            Ok(detail) => {
                                state.detail = Some(detail);
                                state.error = None;
                            }
                            Err(err) => {
                                state.error = Some(err.to_string());
                            }
                        }
                    }
                }
            }
            AppMessage::RemoteImageLoaded { key, result } => {
                app.image_loading.remove(&key);
                match result {
                    Ok(preview) => {
                        app.pending_previews.insert(key, preview);
                    }
                    Err(err) => {
                        error!("failed to load image {key}: {err}");
                        app.image_errors.insert(key, err);
                    }
                }
                app.on_download_complete();
            }
            AppMessage::FilesPicked { target, paths } => {
                let tx = app.tx.clone();
                match (&mut app.view, target) {
                    (ViewState::Sell(form), IntakeTarget::SellForm) => {
                        form.intake.picking = false;
                        if !paths.is_empty() {
                            form.intake.ingesting = true;
                            tasks::ingest_files(tx, target, paths);
                        }
                    }
                    (ViewState::DonationForm(form), IntakeTarget::DonationForm) => {
                        form.intake.picking = false;
                        if !paths.is_empty() {
                            form.intake.ingesting = true;
                            tasks::ingest_files(tx, target, paths);
                        }
                    }
                    // The owning form is gone; ignore the stale pick.
                    _ => {}
                }
            }
            AppMessage::FilesIngested {
                target,
                accepted,
                rejected,
            } => match (&mut app.view, target) {
                (ViewState::Sell(form), IntakeTarget::SellForm) => {
                    form.intake.ingesting = false;
                    form.intake.accepted.extend(accepted);
                    form.intake.rejected.extend(rejected);
                }
                (ViewState::DonationForm(form), IntakeTarget::DonationForm) => {
                    form.intake.ingesting = false;
                    // One image per donation; the newest selection replaces
                    // the old one and frees its preview texture.
                    if let Some(image) = accepted.into_iter().next_back() {
                        for old in form.intake.accepted.drain(..) {
                            app.textures.remove(&old.key);
                        }
                        form.intake.accepted.push(image);
                    }
                    form.intake.rejected.extend(rejected);
                }
                _ => {}
            },
            AppMessage::UrlProbeFinished {
                target,
                slot,
                revision,
                result,
            } => {
                let slot_state = match (&mut app.view, target) {
                    (ViewState::Sell(form), IntakeTarget::SellForm) => {
                        form.url_slots.get_mut(slot)
                    }
                    (ViewState::DonationForm(form), IntakeTarget::DonationForm) if slot == 0 => {
                        Some(&mut form.url_slot)
                    }
                    _ => None,
                };
                // Drop probes for slots that were edited or cleared since.
                if let Some(slot_state) = slot_state {
                    if slot_state.revision == revision {
                        slot_state.checking = false;
                        match result {
                            Ok(preview) => {
                                slot_state.preview = Some(preview);
                                slot_state.error = None;
                            }
                            Err(err) => {
                                slot_state.preview = None;
                                slot_state.error = Some(err);
                            }
                        }
                    }
                }
            }
            AppMessage::ExistingListingLoaded { listing_id, result } => {
                if let ViewState::Sell(form) = &mut app.view {
                    if form.listing_id.as_deref() == Some(listing_id.as_str()) {
                        form.loading_existing = false;
                        match result {
                            Ok((images, specifications)) => {
                                form.existing =
                                    images.into_iter().map(|image| (image, true)).collect();
                                form.specs =
                                    crate::specs::SpecEditor::from_existing(&specifications);
                            }
                            Err(err) => {
                                form.error =
                                    Some(format!("could not load existing images: {err}"));
                            }
                        }
                    }
                }
            }
            AppMessage::ListingSubmitted(result) => {
                let mut published = None;
                if let ViewState::Sell(form) = &mut app.view {
                    form.submitting = false;
                    match result {
                        Ok(listing) => published = Some(listing),
                        Err(err) => form.error = Some(format!("{err:#}")),
                    }
                }
                if let Some(listing) = published {
                    app.info_banner = Some("Listing published".into());
                    let listing_id = listing.id.clone();
                    app.view = ViewState::Detail(DetailState::new(listing_id.clone()));
                    app.spawn_load_detail(&listing_id);
                    app.spawn_load_listings();
                }
            }
            AppMessage::ListingDeleted { listing_id, result } => match result {
                Ok(()) => {
                    if let ViewState::Account(state) = &mut app.view {
                        state.my_listings.retain(|listing| listing.id != listing_id);
                    }
                    app.info_banner = Some("Listing removed".into());
                    app.spawn_load_listings();
                }
                Err(err) => {
                    app.info_banner = Some(format!("Failed to remove listing: {err}"));
                }
            },
            AppMessage::ListingMarkedSold { listing_id, result } => match result {
                Ok(()) => {
                    if let ViewState::Account(state) = &mut app.view {
                        for listing in &mut state.my_listings {
                            if listing.id == listing_id {
                                listing.status = crate::models::ListingStatus::Sold;
                            }
                        }
                    }
                    app.info_banner = Some("Listing marked as sold".into());
                    app.spawn_load_listings();
                }
                Err(err) => {
                    app.info_banner = Some(format!("Failed to mark as sold: {err}"));
                }
            },
            AppMessage::DonationsLoaded(result) => {
                app.donations_loading = false;
                match result {
                    Ok(donations) => {
                        app.donations = donations;
                        app.donations_error = None;
                    }
                    Err(err) => {
                        app.donations_error = Some(err.to_string());
                    }
                }
            }
            AppMessage::DonationSubmitted(result) => {
                let mut posted = false;
                if let ViewState::DonationForm(form) = &mut app.view {
                    form.submitting = false;
                    match result {
                        Ok(_) => posted = true,
                        Err(err) => form.error = Some(format!("{err:#}")),
                    }
                }
                if posted {
                    app.info_banner = Some("Donation posted. Thank you!".into());
                    app.view = ViewState::Donations;
                    app.spawn_load_donations();
                }
            }
            AppMessage::DonationClaimed {
                donation_id,
                result,
            } => match result {
                Ok(()) => {
                    let mut contact = None;
                    for donation in &mut app.donations {
                        if donation.id == donation_id {
                            donation.status = crate::models::DonationStatus::Claimed;
                            contact = Some(format!(
                                "Claimed! Contact {}: {} {}",
                                donation.contact_name,
                                donation.contact_phone,
                                donation.contact_email
                            ));
                        }
                    }
                    app.info_banner =
                        contact.or_else(|| Some("Donation claimed".to_string()));
                }
                Err(err) => {
                    app.info_banner = Some(format!("Failed to claim donation: {err}"));
                }
            },
            AppMessage::FavoritesIndexLoaded(result) => match result {
                Ok(favorites) => {
                    app.favorite_ids = favorites
                        .into_iter()
                        .map(|favorite| favorite.listing_id)
                        .collect::<HashSet<_>>();
                }
                Err(err) => warn!("failed to load favorites: {err}"),
            },
            AppMessage::FavoriteToggled {
                listing_id,
                now_favorite,
                result,
            } => match result {
                Ok(()) => {
                    let delta = if now_favorite {
                        app.favorite_ids.insert(listing_id.clone());
                        1
                    } else {
                        app.favorite_ids.remove(&listing_id);
                        -1
                    };
                    for listing in &mut app.listings {
                        if listing.id == listing_id {
                            listing.favorites_count += delta;
                        }
                    }
                    if let ViewState::Detail(state) = &mut app.view {
                        if let Some(detail) = &mut state.detail {
                            if detail.listing.id == listing_id {
                                detail.listing.favorites_count += delta;
                            }
                        }
                    }
                }
                Err(err) => {
                    app.info_banner = Some(format!("Could not update favorite: {err}"));
                }
            },
            AppMessage::FavoriteListingsLoaded(result) => {
                if let ViewState::Account(state) = &mut app.view {
                    state.favorites_loading = false;
                    match result {
                        Ok(listings) => {
                            state.favorites = listings;
                            state.favorites_error = None;
                        }
                        Err(err) => {
                            state.favorites_error = Some(err.to_string());
                        }
                    }
                }
            }
            AppMessage::MyListingsLoaded(result) => {
                if let ViewState::Account(state) = &mut app.view {
                    state.my_listings_loading = false;
                    match result {
                        Ok(listings) => {
                            state.my_listings = listings;
                            state.my_listings_error = None;
                        }
                        Err(err) => {
                            state.my_listings_error = Some(err.to_string());
                        }
                    }
                }
            }
            AppMessage::SessionValidated(result) => {
                if let Err(err) = result {
                    warn!("restored session rejected: {err}");
                    app.api.set_session(None);
                    if let Err(err) = config::store_session(&config::session_path(), None) {
                        warn!("failed to clear session cache: {err}");
                    }
                    app.profile = None;
                    app.favorite_ids.clear();
                    app.info_banner = Some("Session expired, sign in again".into());
                }
            }
            AppMessage::SignedIn(result) => {
                app.auth.busy = false;
                match result {
                    Ok(session) => app.complete_sign_in(session),
                    Err(err) => {
                        app.auth.error = Some(err.to_string());
                    }
                }
            }
            AppMessage::SignedUp(result) => {
                app.auth.busy = false;
                match result {
                    Ok(Some(session)) => app.complete_sign_in(session),
                    Ok(None) => {
                        app.auth.notice =
                            Some("Check your email to confirm your account".into());
                    }
                    Err(err) => {
                        app.auth.error = Some(err.to_string());
                    }
                }
            }
            AppMessage::SignedOut(result) => {
                app.profile = None;
                app.favorite_ids.clear();
                if let Err(err) = config::store_session(&config::session_path(), None) {
                    warn!("failed to clear session cache: {err}");
                }
                match result {
                    Ok(()) => {
                        app.info_banner = Some("Signed out".into());
                    }
                    Err(err) => {
                        app.info_banner = Some(format!("Signed out locally ({err})"));
                    }
                }
                if matches!(
                    app.view,
                    ViewState::Sell(_)
                        | ViewState::Account(_)
                        | ViewState::Admin(_)
                        | ViewState::DonationForm(_)
                ) {
                    app.view = ViewState::Browse;
                }
            }
            AppMessage::PasswordResetRequested(result) => {
                app.auth.busy = false;
                match result {
                    Ok(()) => {
                        app.auth.notice = Some("Password reset email sent".into());
                    }
                    Err(err) => {
                        app.auth.error = Some(err.to_string());
                    }
                }
            }
            AppMessage::PasswordUpdated(result) => {
                if let ViewState::Account(state) = &mut app.view {
                    state.password_updating = false;
                    match result {
                        Ok(()) => {
                            state.new_password.clear();
                            state.password_notice = Some("Password updated".into());
                        }
                        Err(err) => {
                            state.password_notice = Some(format!("Update failed: {err}"));
                        }
                    }
                }
            }
            AppMessage::ProfileLoaded(result) => match result {
                Ok(Some(profile)) => {
                    app.profile = Some(profile);
                }
                Ok(None) => {}
                Err(err) => warn!("failed to load profile: {err}"),
            },
            AppMessage::ProfileSaved { result, profile } => {
                if let ViewState::Account(state) = &mut app.view {
                    state.profile_saving = false;
                    match &result {
                        Ok(()) => state.profile_error = None,
                        Err(err) => state.profile_error = Some(err.to_string()),
                    }
                }
                if result.is_ok() {
                    app.profile = Some(profile);
                    app.info_banner = Some("Profile saved".into());
                }
            }
            AppMessage::TransactionsLoaded(result) => {
                if let ViewState::Admin(state) = &mut app.view {
                    state.loading = false;
                    match result {
                        Ok(transactions) => {
                            state.transactions = transactions;
                            state.error = None;
                        }
                        Err(err) => {
                            state.error = Some(err.to_string());
                        }
                    }
                }
            }
            AppMessage::TransactionReviewed {
                transaction_id,
                result,
            } => {
                let mut settled = false;
                if let ViewState::Admin(state) = &mut app.view {
                    state.acting.remove(&transaction_id);
                    match result {
                        Ok(()) => {
                            state
                                .transactions
                                .retain(|transaction| transaction.id != transaction_id);
                            settled = true;
                        }
                        Err(err) => {
                            state.error = Some(err.to_string());
                        }
                    }
                }
                if settled {
                    app.info_banner = Some("Transaction settled".into());
                    app.spawn_load_listings();
                }
            }
            AppMessage::CheckoutStarted { listing_id, result } => {
                if let ViewState::Detail(state) = &mut app.view {
                    if state.listing_id == listing_id {
                        state.buying = false;
                    }
                }
                match result {
                    Ok(transaction) => {
                        app.info_banner = Some(format!(
                            "Order {} recorded, finish payment in your browser",
                            transaction.provider_order_id
                        ));
                    }
                    Err(err) => {
                        app.info_banner = Some(format!("Could not start checkout: {err}"));
                    }
                }
            }
            AppMessage::BucketsLoaded(result) => {
                if let ViewState::Admin(state) = &mut app.view {
                    match result {
                        Ok(buckets) => {
                            let names: Vec<&str> =
                                buckets.iter().map(|bucket| bucket.name.as_str()).collect();
                            state.storage_note =
                                Some(format!("Storage online, buckets: {}", names.join(", ")));
                        }
                        Err(err) => {
                            state.storage_note = Some(format!("Storage check failed: {err}"));
                        }
                    }
                }
            }
        }
    }
}
