use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Excellent,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Excellent => "Excellent",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[default]
    Available,
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub negotiable: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: ListingStatus,
    pub seller_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub favorites_count: i64,
    /// Populated when the query embeds the image rows.
    #[serde(default, rename = "listing_images")]
    pub images: Vec<ListingImage>,
}

impl Listing {
    /// URL of the image shown on catalog cards: the primary row, falling back
    /// to the lowest display order.
    pub fn primary_image_url(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.iter().min_by_key(|image| image.display_order))
            .map(|image| image.url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingImage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub listing_id: String,
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewListingImage {
    pub listing_id: String,
    pub url: String,
    pub is_primary: bool,
    pub display_order: i64,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub listing_id: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSpecification {
    pub listing_id: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub category_name: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub condition: Condition,
    pub negotiable: bool,
    pub location: String,
    pub status: ListingStatus,
    pub seller_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct NewDonation {
    pub item_name: String,
    pub description: String,
    pub category_id: String,
    pub category_name: String,
    pub condition: Condition,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub location: String,
    pub image_url: Option<String>,
    pub status: DonationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub listing_id: String,
    #[serde(default)]
    pub listing_title: String,
    pub buyer_id: String,
    pub amount: f64,
    #[serde(default)]
    pub provider_order_id: String,
    #[serde(default)]
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub listing_id: String,
    pub listing_title: String,
    pub buyer_id: String,
    pub amount: f64,
    pub provider_order_id: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub listing_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_round_trips_lowercase() {
        let raw = serde_json::to_string(&Condition::Excellent).expect("serialize");
        assert_eq!(raw, "\"excellent\"");
        let parsed: Condition = serde_json::from_str("\"poor\"").expect("deserialize");
        assert_eq!(parsed, Condition::Poor);
    }

    #[test]
    fn listing_tolerates_missing_optional_fields() {
        let raw = r#"{
            "id": "l1",
            "title": "Desk lamp",
            "category_id": "c1",
            "price": 12.5,
            "seller_id": "u1",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let listing: Listing = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(listing.condition, Condition::Good);
        assert_eq!(listing.status, ListingStatus::Available);
        assert!(listing.images.is_empty());
        assert!(listing.primary_image_url().is_none());
    }

    #[test]
    fn primary_image_prefers_flag_over_order() {
        let raw = r#"{
            "id": "l1",
            "title": "Desk lamp",
            "category_id": "c1",
            "price": 12.5,
            "seller_id": "u1",
            "created_at": "2024-01-01T00:00:00Z",
            "listing_images": [
                {"url": "https://cdn.example.com/b.jpg", "display_order": 1, "is_primary": true},
                {"url": "https://cdn.example.com/a.jpg", "display_order": 0}
            ]
        }"#;
        let listing: Listing = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(
            listing.primary_image_url(),
            Some("https://cdn.example.com/b.jpg")
        );
    }
}
