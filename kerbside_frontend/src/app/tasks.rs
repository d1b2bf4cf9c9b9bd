use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use log::{error, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::detail;
use crate::intake;
use crate::models::{NewDonation, NewTransaction, Profile, TransactionStatus};
use crate::pipeline::{self, ListingSubmission, DONATION_BUCKET};

use super::messages::AppMessage;
use super::state::IntakeTarget;

fn send(tx: &Sender<AppMessage>, message: AppMessage) {
    if tx.send(message).is_err() {
        error!("app message channel closed");
    }
}

pub fn load_listings(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_available_listings();
        send(&tx, AppMessage::ListingsLoaded(result));
    });
}

pub fn load_categories(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_categories();
        send(&tx, AppMessage::CategoriesLoaded(result));
    });
}

pub fn load_detail(api: ApiClient, tx: Sender<AppMessage>, listing_id: String) {
    thread::spawn(move || {
        let result = detail::load_listing_detail(&api, &listing_id);
        send(&tx, AppMessage::DetailLoaded { listing_id, result });
    });
}

/// Fetch a remote image over the plain probe client and decode it for the
/// texture cache. `key` identifies the cache entry (the URL itself).
pub fn fetch_remote_image(tx: Sender<AppMessage>, key: String, url: String) {
    thread::spawn(move || {
        let result = (|| {
            let client = crate::api::probe_client().map_err(|err| err.to_string())?;
            let response = client.get(&url).send().map_err(|err| err.to_string())?;
            let bytes = response.bytes().map_err(|err| err.to_string())?;
            intake::decode_preview(&bytes)
        })();
        send(&tx, AppMessage::RemoteImageLoaded { key, result });
    });
}

pub fn pick_files(tx: Sender<AppMessage>, target: IntakeTarget, multiple: bool) {
    thread::spawn(move || {
        let dialog = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif"]);
        let paths: Vec<PathBuf> = if multiple {
            dialog.pick_files().unwrap_or_default()
        } else {
            dialog.pick_file().into_iter().collect()
        };
        send(&tx, AppMessage::FilesPicked { target, paths });
    });
}

/// Validate and decode every picked file. Failures are collected per file
/// and never abort the rest of the batch.
pub fn ingest_files(tx: Sender<AppMessage>, target: IntakeTarget, paths: Vec<PathBuf>) {
    thread::spawn(move || {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for path in paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            match intake::ingest_file(&path) {
                Ok(image) => accepted.push(image),
                Err(err) => rejected.push((name, err.to_string())),
            }
        }
        send(
            &tx,
            AppMessage::FilesIngested {
                target,
                accepted,
                rejected,
            },
        );
    });
}

/// Full remote-URL validation: syntax, heuristic, then the load probe. The
/// result carries the slot and revision so stale probes can be dropped.
pub fn probe_url(
    tx: Sender<AppMessage>,
    target: IntakeTarget,
    slot: usize,
    revision: u64,
    raw_url: String,
) {
    thread::spawn(move || {
        let result = (|| {
            let url = intake::validate_image_url(&raw_url)?;
            let client = crate::api::probe_client().map_err(|err| err.to_string())?;
            let response = client
                .get(url)
                .send()
                .map_err(|err| format!("could not load image: {err}"))?;
            let bytes = response
                .bytes()
                .map_err(|err| format!("could not load image: {err}"))?;
            intake::decode_preview(&bytes).map_err(|err| format!("not a decodable image: {err}"))
        })();
        send(
            &tx,
            AppMessage::UrlProbeFinished {
                target,
                slot,
                revision,
                result,
            },
        );
    });
}

pub fn load_existing_listing(api: ApiClient, tx: Sender<AppMessage>, listing_id: String) {
    thread::spawn(move || {
        let result = api
            .list_listing_images(&listing_id)
            .and_then(|images| Ok((images, api.list_specifications(&listing_id)?)));
        send(
            &tx,
            AppMessage::ExistingListingLoaded { listing_id, result },
        );
    });
}

pub fn submit_listing(api: ApiClient, tx: Sender<AppMessage>, submission: ListingSubmission) {
    thread::spawn(move || {
        let result = pipeline::submit(&api, &submission);
        send(&tx, AppMessage::ListingSubmitted(result));
    });
}

pub fn delete_listing(api: ApiClient, tx: Sender<AppMessage>, listing_id: String) {
    thread::spawn(move || {
        let result = api.delete_listing(&listing_id);
        send(&tx, AppMessage::ListingDeleted { listing_id, result });
    });
}

pub fn mark_listing_sold(api: ApiClient, tx: Sender<AppMessage>, listing_id: String) {
    thread::spawn(move || {
        let result = api.update_listing(&listing_id, &json!({ "status": "sold" }));
        send(&tx, AppMessage::ListingMarkedSold { listing_id, result });
    });
}

pub fn load_donations(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_available_donations();
        send(&tx, AppMessage::DonationsLoaded(result));
    });
}

/// A donation ships at most one image: an uploaded file wins over a URL.
pub fn submit_donation(
    api: ApiClient,
    tx: Sender<AppMessage>,
    mut donation: NewDonation,
    image: Option<crate::intake::AcceptedImage>,
    image_url: Option<String>,
) {
    thread::spawn(move || {
        let result = (|| {
            if let Some(image) = image {
                let (bytes, content_type, extension) = intake::compress_for_upload(&image);
                let path = format!("donations/{}.{extension}", Uuid::new_v4());
                donation.image_url =
                    Some(api.upload_object(DONATION_BUCKET, &path, bytes, content_type)?);
            } else if image_url.is_some() {
                donation.image_url = image_url;
            }
            api.insert_donation(&donation)
        })();
        send(&tx, AppMessage::DonationSubmitted(result));
    });
}

pub fn claim_donation(api: ApiClient, tx: Sender<AppMessage>, donation_id: String) {
    thread::spawn(move || {
        let result = api.claim_donation(&donation_id);
        send(&tx, AppMessage::DonationClaimed { donation_id, result });
    });
}

pub fn load_favorites_index(api: ApiClient, tx: Sender<AppMessage>, user_id: String) {
    thread::spawn(move || {
        let result = api.list_favorites(&user_id);
        send(&tx, AppMessage::FavoritesIndexLoaded(result));
    });
}

/// The favorites row is authoritative; the counter RPC is best-effort and
/// swallows its own failure.
pub fn toggle_favorite(
    api: ApiClient,
    tx: Sender<AppMessage>,
    user_id: String,
    listing_id: String,
    add: bool,
) {
    thread::spawn(move || {
        let result = if add {
            api.add_favorite(&user_id, &listing_id)
        } else {
            api.remove_favorite(&user_id, &listing_id)
        };
        if result.is_ok() {
            let counter = if add {
                api.increment_favorites(&listing_id)
            } else {
                api.decrement_favorites(&listing_id)
            };
            if let Err(err) = counter {
                warn!("favorites counter for {listing_id} not adjusted: {err}");
            }
        }
        send(
            &tx,
            AppMessage::FavoriteToggled {
                listing_id,
                now_favorite: add,
                result,
            },
        );
    });
}

pub fn load_favorite_listings(api: ApiClient, tx: Sender<AppMessage>, user_id: String) {
    thread::spawn(move || {
        let result = api.list_favorites(&user_id).and_then(|favorites| {
            let ids: Vec<String> = favorites.into_iter().map(|f| f.listing_id).collect();
            api.list_listings_by_ids(&ids)
        });
        send(&tx, AppMessage::FavoriteListingsLoaded(result));
    });
}

pub fn load_my_listings(api: ApiClient, tx: Sender<AppMessage>, user_id: String) {
    thread::spawn(move || {
        let result = api.list_listings_for_seller(&user_id);
        send(&tx, AppMessage::MyListingsLoaded(result));
    });
}

// ---- auth ----

pub fn sign_in(api: ApiClient, tx: Sender<AppMessage>, email: String, password: String) {
    thread::spawn(move || {
        let result = api.sign_in(&email, &password);
        send(&tx, AppMessage::SignedIn(result));
    });
}

pub fn sign_up(
    api: ApiClient,
    tx: Sender<AppMessage>,
    email: String,
    password: String,
    profile_fields: Value,
) {
    thread::spawn(move || {
        let result = api.sign_up(&email, &password, &profile_fields);
        send(&tx, AppMessage::SignedUp(result));
    });
}

/// Confirms a restored session is still honoured by the service.
pub fn validate_session(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.fetch_user();
        send(&tx, AppMessage::SessionValidated(result));
    });
}

pub fn sign_out(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.sign_out();
        send(&tx, AppMessage::SignedOut(result));
    });
}

pub fn request_password_reset(api: ApiClient, tx: Sender<AppMessage>, email: String) {
    thread::spawn(move || {
        let result = api.request_password_reset(&email);
        send(&tx, AppMessage::PasswordResetRequested(result));
    });
}

pub fn update_password(api: ApiClient, tx: Sender<AppMessage>, new_password: String) {
    thread::spawn(move || {
        let result = api.update_password(&new_password);
        send(&tx, AppMessage::PasswordUpdated(result));
    });
}

pub fn load_profile(api: ApiClient, tx: Sender<AppMessage>, user_id: String) {
    thread::spawn(move || {
        let result = api.get_profile(&user_id);
        send(&tx, AppMessage::ProfileLoaded(result));
    });
}

pub fn save_profile(api: ApiClient, tx: Sender<AppMessage>, profile: Profile) {
    thread::spawn(move || {
        let result = api.upsert_profile(&profile);
        send(&tx, AppMessage::ProfileSaved { result, profile });
    });
}

// ---- payments & admin ----

/// Records the pending transaction, then hands the approval URL to the
/// system browser. Settlement happens in the admin review screen.
pub fn start_checkout(
    api: ApiClient,
    tx: Sender<AppMessage>,
    listing_id: String,
    listing_title: String,
    amount: f64,
    buyer_id: String,
    checkout_url: Option<String>,
) {
    thread::spawn(move || {
        let order_id = Uuid::new_v4().to_string();
        let result = api.insert_transaction(&NewTransaction {
            listing_id: listing_id.clone(),
            listing_title,
            buyer_id,
            amount,
            provider_order_id: order_id.clone(),
            status: TransactionStatus::Pending,
        });
        if result.is_ok() {
            if let Some(base) = checkout_url {
                let approval = format!("{base}?order={order_id}&amount={amount:.2}");
                if let Err(err) = open::that(&approval) {
                    warn!("could not open checkout page: {err}");
                }
            }
        }
        send(&tx, AppMessage::CheckoutStarted { listing_id, result });
    });
}

pub fn load_pending_transactions(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_pending_transactions();
        send(&tx, AppMessage::TransactionsLoaded(result));
    });
}

/// Approval settles the transaction and marks the listing sold; rejection
/// only flips the transaction status.
pub fn review_transaction(
    api: ApiClient,
    tx: Sender<AppMessage>,
    transaction_id: String,
    listing_id: String,
    approve: bool,
) {
    thread::spawn(move || {
        let result = if approve {
            api.set_transaction_status(&transaction_id, TransactionStatus::Completed)
                .and_then(|_| api.update_listing(&listing_id, &json!({ "status": "sold" })))
        } else {
            api.set_transaction_status(&transaction_id, TransactionStatus::Rejected)
        };
        send(
            &tx,
            AppMessage::TransactionReviewed {
                transaction_id,
                result,
            },
        );
    });
}

pub fn load_buckets(api: ApiClient, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_buckets();
        send(&tx, AppMessage::BucketsLoaded(result));
    });
}
