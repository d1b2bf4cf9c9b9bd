use anyhow::{bail, Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::intake::{compress_for_upload, AcceptedImage};
use crate::models::{Listing, ListingImage, NewListing, NewListingImage, NewSpecification};
use crate::specs::SpecPair;

pub const LISTING_BUCKET: &str = "listing-images";
pub const DONATION_BUCKET: &str = "donation-images";

/// The three image sources merged by one submission: retained rows (edit
/// only), freshly accepted local files, and validated remote URLs.
#[derive(Default)]
pub struct ImagePlan {
    pub kept: Vec<ListingImage>,
    pub files: Vec<AcceptedImage>,
    pub urls: Vec<String>,
}

impl ImagePlan {
    pub fn total(&self) -> usize {
        self.kept.len() + self.files.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// One listing submission, shared by the create and edit paths.
pub struct ListingSubmission {
    /// `Some` on edit, `None` on create.
    pub listing_id: Option<String>,
    pub fields: NewListing,
    pub plan: ImagePlan,
    pub specifications: Vec<SpecPair>,
}

/// Merge order: kept existing images first (original order), then uploaded
/// files, then URL-sourced images verbatim. Index 0 is primary and display
/// order is dense from zero.
pub fn assemble_rows(
    listing_id: &str,
    kept: &[ListingImage],
    uploaded_urls: &[String],
    url_images: &[String],
    alt_text: &str,
) -> Vec<NewListingImage> {
    kept.iter()
        .map(|image| image.url.clone())
        .chain(uploaded_urls.iter().cloned())
        .chain(url_images.iter().cloned())
        .enumerate()
        .map(|(index, url)| NewListingImage {
            listing_id: listing_id.to_string(),
            url,
            is_primary: index == 0,
            display_order: index as i64,
            alt_text: Some(alt_text.to_string()),
        })
        .collect()
}

/// Uploads each accepted file to durable storage and returns its public URL,
/// in input order. Stops at the first failure; already-shipped objects are
/// not cleaned up (the whole submission is retryable instead).
pub fn upload_new_files(
    api: &ApiClient,
    bucket: &str,
    listing_id: &str,
    files: &[AcceptedImage],
) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let (bytes, content_type, extension) = compress_for_upload(file);
        let path = format!("{listing_id}/{}.{extension}", Uuid::new_v4());
        let url = api
            .upload_object(bucket, &path, bytes, content_type)
            .with_context(|| format!("failed to upload {}", file.file_name))?;
        urls.push(url);
    }
    Ok(urls)
}

/// Runs a whole listing submission: listing row, then images, then
/// specifications, sequentially. The image invariant is checked before any
/// network call; later steps are not transactional with earlier ones.
pub fn submit(api: &ApiClient, submission: &ListingSubmission) -> Result<Listing> {
    if submission.plan.is_empty() {
        bail!("add at least one image before publishing");
    }

    let listing = match &submission.listing_id {
        None => api.insert_listing(&submission.fields)?,
        Some(id) => {
            api.update_listing(id, &edit_patch(&submission.fields))?;
            api.get_listing(id)?
                .context("listing disappeared while saving")?
        }
    };

    let uploaded = upload_new_files(api, LISTING_BUCKET, &listing.id, &submission.plan.files)?;
    let rows = assemble_rows(
        &listing.id,
        &submission.plan.kept,
        &uploaded,
        &submission.plan.urls,
        &listing.title,
    );
    api.replace_listing_images(&listing.id, &rows)?;

    let spec_rows: Vec<NewSpecification> = submission
        .specifications
        .iter()
        .map(|pair| NewSpecification {
            listing_id: listing.id.clone(),
            name: pair.name.clone(),
            value: pair.value.clone(),
        })
        .collect();
    api.replace_specifications(&listing.id, &spec_rows)?;

    Ok(listing)
}

/// Fields an edit may change. Seller and status are deliberately absent.
fn edit_patch(fields: &NewListing) -> serde_json::Value {
    json!({
        "title": fields.title,
        "description": fields.description,
        "category_id": fields.category_id,
        "category_name": fields.category_name,
        "price": fields.price,
        "original_price": fields.original_price,
        "condition": fields.condition,
        "negotiable": fields.negotiable,
        "location": fields.location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use pretty_assertions::assert_eq;

    fn kept_image(url: &str, order: i64) -> ListingImage {
        ListingImage {
            id: Some(format!("img-{order}")),
            listing_id: "l1".into(),
            url: url.to_string(),
            is_primary: order == 0,
            display_order: order,
            alt_text: None,
        }
    }

    #[test]
    fn merge_order_is_kept_then_uploaded_then_urls() {
        let kept = vec![
            kept_image("https://cdn.test/kept-a.jpg", 0),
            kept_image("https://cdn.test/kept-b.jpg", 1),
        ];
        let uploaded = vec!["https://cdn.test/new-upload.jpg".to_string()];
        let urls = vec!["https://images.elsewhere.test/remote.png".to_string()];

        let rows = assemble_rows("l1", &kept, &uploaded, &urls, "Desk lamp");

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].url, "https://cdn.test/kept-a.jpg");
        assert!(rows[0].is_primary);
        assert!(rows[1..].iter().all(|row| !row.is_primary));
        let orders: Vec<i64> = rows.iter().map(|row| row.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
        assert_eq!(rows[3].url, "https://images.elsewhere.test/remote.png");
        assert_eq!(rows[0].alt_text.as_deref(), Some("Desk lamp"));
    }

    #[test]
    fn single_upload_becomes_the_primary() {
        let uploaded = vec!["https://cdn.test/only.jpg".to_string()];
        let rows = assemble_rows("l1", &[], &uploaded, &[], "Chair");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_primary);
        assert_eq!(rows[0].display_order, 0);
    }

    #[test]
    fn zero_images_are_rejected_before_any_network_call() {
        // The client points nowhere; reaching the network would error very
        // differently from the invariant message asserted here.
        let api = ApiClient::new(&AppConfig {
            api_url: "http://service.invalid".into(),
            api_key: String::new(),
            checkout_url: None,
        })
        .expect("client");
        let submission = ListingSubmission {
            listing_id: None,
            fields: NewListing::default(),
            plan: ImagePlan::default(),
            specifications: Vec::new(),
        };
        let err = submit(&api, &submission).expect_err("rejected");
        assert!(err.to_string().contains("at least one image"));
    }

    #[test]
    fn edit_patch_never_touches_seller_or_status() {
        let patch = edit_patch(&NewListing::default());
        let map = patch.as_object().expect("object");
        assert!(!map.contains_key("seller_id"));
        assert!(!map.contains_key("status"));
        assert!(map.contains_key("price"));
    }
}
