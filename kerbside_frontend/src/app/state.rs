use std::collections::HashSet;

use crate::detail::ListingDetail;
use crate::intake::{AcceptedImage, Preview};
use crate::models::{Condition, Listing, ListingImage, Transaction};
use crate::specs::SpecEditor;

/// Which form an intake result belongs to; stale results for a closed form
/// are dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeTarget {
    SellForm,
    DonationForm,
}

pub enum ViewState {
    Browse,
    Detail(DetailState),
    Sell(SellFormState),
    Donations,
    DonationForm(DonationFormState),
    Account(AccountState),
    Admin(AdminState),
}

pub struct DetailState {
    pub listing_id: String,
    pub detail: Option<ListingDetail>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub buying: bool,
}

impl DetailState {
    pub fn new(listing_id: String) -> Self {
        Self {
            listing_id,
            detail: None,
            is_loading: true,
            error: None,
            buying: false,
        }
    }
}

/// One remote-image slot on a form. The revision counter keys probe results:
/// a probe that resolves after the slot was edited no longer matches and is
/// ignored.
#[derive(Default)]
pub struct UrlSlot {
    pub input: String,
    pub revision: u64,
    pub checking: bool,
    pub preview: Option<Preview>,
    pub error: Option<String>,
}

impl UrlSlot {
    /// Clears prior probe state and invalidates in-flight probes.
    pub fn reset(&mut self) {
        self.revision += 1;
        self.checking = false;
        self.preview = None;
        self.error = None;
    }

    pub fn is_valid(&self) -> bool {
        !self.checking && self.error.is_none() && self.preview.is_some()
    }

    pub fn texture_key(&self, index: usize) -> String {
        format!("url-slot:{index}:{}", self.revision)
    }
}

#[derive(Default)]
pub struct IntakeState {
    pub accepted: Vec<AcceptedImage>,
    pub rejected: Vec<(String, String)>,
    pub picking: bool,
    pub ingesting: bool,
}

pub struct SellFormState {
    /// `Some` while editing an existing listing.
    pub listing_id: Option<String>,
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub category_name: String,
    pub price: String,
    pub original_price: String,
    pub condition: Condition,
    pub negotiable: bool,
    pub location: String,
    /// Existing image rows and whether each one is kept (edit only).
    pub existing: Vec<(ListingImage, bool)>,
    pub intake: IntakeState,
    pub url_slots: Vec<UrlSlot>,
    pub specs: SpecEditor,
    pub loading_existing: bool,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SellFormState {
    pub fn new() -> Self {
        Self {
            listing_id: None,
            title: String::new(),
            description: String::new(),
            category_id: String::new(),
            category_name: String::new(),
            price: String::new(),
            original_price: String::new(),
            condition: Condition::default(),
            negotiable: false,
            location: String::new(),
            existing: Vec::new(),
            intake: IntakeState::default(),
            url_slots: vec![UrlSlot::default()],
            specs: SpecEditor::default(),
            loading_existing: false,
            submitting: false,
            error: None,
        }
    }

    pub fn for_edit(listing: &Listing) -> Self {
        let mut form = Self::new();
        form.listing_id = Some(listing.id.clone());
        form.title = listing.title.clone();
        form.description = listing.description.clone();
        form.category_id = listing.category_id.clone();
        form.category_name = listing.category_name.clone();
        form.price = format!("{:.2}", listing.price);
        form.original_price = listing
            .original_price
            .map(|price| format!("{price:.2}"))
            .unwrap_or_default();
        form.condition = listing.condition;
        form.negotiable = listing.negotiable;
        form.location = listing.location.clone();
        form.loading_existing = true;
        form
    }

    pub fn kept_images(&self) -> Vec<ListingImage> {
        self.existing
            .iter()
            .filter(|(_, keep)| *keep)
            .map(|(image, _)| image.clone())
            .collect()
    }

    pub fn valid_urls(&self) -> Vec<String> {
        self.url_slots
            .iter()
            .filter(|slot| slot.is_valid())
            .map(|slot| slot.input.trim().to_string())
            .collect()
    }

    pub fn total_images(&self) -> usize {
        self.existing.iter().filter(|(_, keep)| *keep).count()
            + self.intake.accepted.len()
            + self.url_slots.iter().filter(|slot| slot.is_valid()).count()
    }
}

pub struct DonationFormState {
    pub item_name: String,
    pub description: String,
    pub category_id: String,
    pub category_name: String,
    pub condition: Condition,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub location: String,
    pub intake: IntakeState,
    pub url_slot: UrlSlot,
    pub submitting: bool,
    pub error: Option<String>,
}

impl DonationFormState {
    pub fn new() -> Self {
        Self {
            item_name: String::new(),
            description: String::new(),
            category_id: String::new(),
            category_name: String::new(),
            condition: Condition::default(),
            contact_name: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
            location: String::new(),
            intake: IntakeState::default(),
            url_slot: UrlSlot::default(),
            submitting: false,
            error: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountTab {
    #[default]
    MyListings,
    Favorites,
    Profile,
}

#[derive(Default)]
pub struct AccountState {
    pub tab: AccountTab,
    pub my_listings: Vec<Listing>,
    pub my_listings_loading: bool,
    pub my_listings_error: Option<String>,
    pub favorites: Vec<Listing>,
    pub favorites_loading: bool,
    pub favorites_error: Option<String>,
    pub display_name: String,
    pub phone: String,
    pub location: String,
    pub inputs_initialized: bool,
    pub profile_saving: bool,
    pub profile_error: Option<String>,
    pub new_password: String,
    pub password_updating: bool,
    pub password_notice: Option<String>,
}

#[derive(Default)]
pub struct AdminState {
    pub transactions: Vec<Transaction>,
    pub loading: bool,
    pub error: Option<String>,
    /// Transaction ids with a review call in flight.
    pub acting: HashSet<String>,
    pub storage_note: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
    Reset,
}

#[derive(Default)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: String,
    pub location: String,
    pub busy: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}
