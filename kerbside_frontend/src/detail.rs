use anyhow::{Context, Result};
use log::warn;

use crate::api::ApiClient;
use crate::models::{Listing, ListingImage, Specification};

pub const SIMILAR_LIMIT: usize = 8;

/// Everything the detail page renders, assembled before the view is shown.
pub struct ListingDetail {
    pub listing: Listing,
    pub images: Vec<ListingImage>,
    pub specifications: Vec<Specification>,
    pub similar: Vec<Listing>,
}

/// Fetches the core row, the ordered image set, the specifications, and a
/// bounded set of similar listings. The secondary reads degrade to empty sets
/// when they fail; a missing core row fails the whole view. Also fires the
/// best-effort view counter, once per visit.
pub fn load_listing_detail(api: &ApiClient, listing_id: &str) -> Result<ListingDetail> {
    let listing = api
        .get_listing(listing_id)
        .with_context(|| format!("failed to load listing {listing_id}"))?
        .context("listing not found")?;

    if let Err(err) = api.increment_view_count(listing_id) {
        warn!("view counter for {listing_id} not incremented: {err}");
    }

    let images = api.list_listing_images(listing_id).unwrap_or_else(|err| {
        warn!("images for {listing_id} unavailable: {err}");
        Vec::new()
    });
    let specifications = api.list_specifications(listing_id).unwrap_or_else(|err| {
        warn!("specifications for {listing_id} unavailable: {err}");
        Vec::new()
    });
    let similar = api
        .similar_listings(&listing.category_id, listing_id, SIMILAR_LIMIT)
        .unwrap_or_else(|err| {
            warn!("similar listings for {listing_id} unavailable: {err}");
            Vec::new()
        });

    Ok(ListingDetail {
        listing,
        images,
        specifications,
        similar,
    })
}
