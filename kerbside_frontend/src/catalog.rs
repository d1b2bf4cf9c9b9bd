use std::cmp::Ordering;

use crate::models::{Donation, Listing};

/// Sentinel category that disables the category filter.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::PriceLow,
        SortKey::PriceHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Newest => "Newest first",
            SortKey::Oldest => "Oldest first",
            SortKey::PriceLow => "Price: low to high",
            SortKey::PriceHigh => "Price: high to low",
        }
    }
}

/// Ephemeral catalog filter state. Never persisted; the result is recomputed
/// from the full listing array on every change.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub category: String,
    pub search: String,
    pub sort: SortKey,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            search: String::new(),
            sort: SortKey::default(),
        }
    }
}

/// Applies category and search filters (conjunction), then the sort. Always
/// works from the full source slice so filters never compound.
pub fn filter_and_sort(listings: &[Listing], filter: &FilterState) -> Vec<Listing> {
    let term = filter.search.trim().to_lowercase();
    let mut result: Vec<Listing> = listings
        .iter()
        .filter(|listing| matches_category(&listing.category_name, &filter.category))
        .filter(|listing| {
            matches_search(&term, [&listing.title, &listing.category_name, &listing.location])
        })
        .cloned()
        .collect();
    sort_listings(&mut result, filter.sort);
    result
}

/// Donations share the catalog's search semantics over name, category, and
/// location; they carry no price, so only the category/search pair applies.
pub fn filter_donations(donations: &[Donation], category: &str, search: &str) -> Vec<Donation> {
    let term = search.trim().to_lowercase();
    donations
        .iter()
        .filter(|donation| matches_category(&donation.category_name, category))
        .filter(|donation| {
            matches_search(
                &term,
                [&donation.item_name, &donation.category_name, &donation.location],
            )
        })
        .cloned()
        .collect()
}

fn matches_category(category_name: &str, selected: &str) -> bool {
    selected == ALL_CATEGORIES || category_name == selected
}

/// Case-insensitive substring over the given fields, OR across fields. An
/// empty term matches everything.
fn matches_search<'a>(term: &str, fields: [&'a String; 3]) -> bool {
    if term.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

fn sort_listings(listings: &mut [Listing], sort: SortKey) {
    match sort {
        // sort_by is stable, so price ties keep their prior relative order.
        SortKey::PriceLow => listings.sort_by(|a, b| compare_price(a, b)),
        SortKey::PriceHigh => listings.sort_by(|a, b| compare_price(b, a)),
        SortKey::Newest => listings.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => listings.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
}

fn compare_price(a: &Listing, b: &Listing) -> Ordering {
    a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, ListingStatus};
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn listing(id: &str, category: &str, price: f64, created: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Item {id}"),
            description: String::new(),
            category_id: category.to_lowercase(),
            category_name: category.to_string(),
            price,
            original_price: None,
            condition: Condition::Good,
            negotiable: false,
            location: "Springfield".to_string(),
            status: ListingStatus::Available,
            seller_id: "seller".to_string(),
            created_at: NaiveDate::parse_from_str(created, "%Y-%m-%d")
                .expect("date")
                .and_hms_opt(0, 0, 0)
                .expect("time")
                .and_utc(),
            view_count: 0,
            favorites_count: 0,
            images: Vec::new(),
        }
    }

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn category_filter_retains_only_that_category() {
        let all = vec![
            listing("1", "Electronics", 10.0, "2024-01-01"),
            listing("2", "Furniture", 20.0, "2024-01-02"),
            listing("3", "Electronics", 30.0, "2024-01-03"),
        ];
        let filter = FilterState {
            category: "Electronics".into(),
            ..FilterState::default()
        };
        let result = filter_and_sort(&all, &filter);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|l| l.category_name == "Electronics"));
    }

    #[test]
    fn all_sentinel_disables_the_category_filter() {
        let all = vec![
            listing("1", "Electronics", 10.0, "2024-01-01"),
            listing("2", "Furniture", 20.0, "2024-01-02"),
        ];
        let result = filter_and_sort(&all, &FilterState::default());
        assert_eq!(result.len(), all.len());
    }

    #[test]
    fn search_matches_any_of_the_three_fields() {
        let mut by_title = listing("1", "Electronics", 10.0, "2024-01-01");
        by_title.title = "Vintage Lamp".into();
        let by_category = listing("2", "Lampshades", 20.0, "2024-01-02");
        let mut by_location = listing("3", "Furniture", 30.0, "2024-01-03");
        by_location.location = "Lampeter".into();
        let mut no_match = listing("4", "Furniture", 40.0, "2024-01-04");
        no_match.title = "Chair".into();

        let filter = FilterState {
            search: "LAMP".into(),
            ..FilterState::default()
        };
        let result = filter_and_sort(
            &[by_title, by_category, by_location, no_match],
            &filter,
        );
        let mut found = ids(&result);
        found.sort();
        assert_eq!(found, vec!["1", "2", "3"]);
    }

    #[test]
    fn price_sorts_reverse_each_other_without_ties() {
        let all = vec![
            listing("1", "A", 30.0, "2024-01-01"),
            listing("2", "A", 10.0, "2024-01-02"),
            listing("3", "A", 20.0, "2024-01-03"),
        ];
        let low = filter_and_sort(
            &all,
            &FilterState {
                sort: SortKey::PriceLow,
                ..FilterState::default()
            },
        );
        let high = filter_and_sort(
            &all,
            &FilterState {
                sort: SortKey::PriceHigh,
                ..FilterState::default()
            },
        );
        let mut reversed = ids(&high);
        reversed.reverse();
        assert_eq!(ids(&low), vec!["2", "3", "1"]);
        assert_eq!(ids(&low), reversed);
    }

    #[test]
    fn price_ties_keep_prior_relative_order() {
        let all = vec![
            listing("1", "A", 10.0, "2024-01-01"),
            listing("2", "A", 10.0, "2024-01-02"),
            listing("3", "A", 5.0, "2024-01-03"),
        ];
        let result = filter_and_sort(
            &all,
            &FilterState {
                sort: SortKey::PriceLow,
                ..FilterState::default()
            },
        );
        assert_eq!(ids(&result), vec!["3", "1", "2"]);
    }

    #[test]
    fn empty_and_singleton_arrays_are_stable_under_every_sort() {
        let one = vec![listing("1", "A", 10.0, "2024-01-01")];
        for sort in SortKey::ALL {
            let filter = FilterState {
                sort,
                ..FilterState::default()
            };
            assert!(filter_and_sort(&[], &filter).is_empty());
            assert_eq!(ids(&filter_and_sort(&one, &filter)), vec!["1"]);
        }
    }

    #[test]
    fn scenario_price_low_and_newest_agree() {
        let all = vec![
            listing("1", "A", 100.0, "2024-01-01"),
            listing("2", "A", 50.0, "2024-02-01"),
        ];
        let by_price = filter_and_sort(
            &all,
            &FilterState {
                sort: SortKey::PriceLow,
                ..FilterState::default()
            },
        );
        assert_eq!(ids(&by_price), vec!["2", "1"]);
        let by_age = filter_and_sort(
            &all,
            &FilterState {
                sort: SortKey::Newest,
                ..FilterState::default()
            },
        );
        assert_eq!(ids(&by_age), vec!["2", "1"]);
    }

    #[test]
    fn filters_apply_as_a_conjunction_before_sorting() {
        let mut match_both = listing("1", "Electronics", 20.0, "2024-01-01");
        match_both.title = "Radio".into();
        let mut wrong_category = listing("2", "Furniture", 10.0, "2024-01-02");
        wrong_category.title = "Radio cabinet".into();
        let wrong_search = listing("3", "Electronics", 5.0, "2024-01-03");

        let filter = FilterState {
            category: "Electronics".into(),
            search: "radio".into(),
            sort: SortKey::PriceLow,
        };
        let result = filter_and_sort(&[match_both, wrong_category, wrong_search], &filter);
        assert_eq!(ids(&result), vec!["1"]);
    }

    #[test]
    fn donation_filter_shares_search_semantics() {
        use crate::models::{Donation, DonationStatus};
        let donation = |id: &str, name: &str, category: &str| Donation {
            id: id.to_string(),
            item_name: name.to_string(),
            description: String::new(),
            category_id: category.to_lowercase(),
            category_name: category.to_string(),
            condition: Condition::Good,
            contact_name: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
            location: "Springfield".to_string(),
            image_url: None,
            status: DonationStatus::Available,
            created_at: Utc.timestamp_opt(0, 0).single().expect("timestamp"),
        };
        let all = vec![
            donation("1", "Winter coat", "Clothing"),
            donation("2", "Bookshelf", "Furniture"),
        ];
        let result = filter_donations(&all, ALL_CATEGORIES, "coat");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1");
        assert_eq!(filter_donations(&all, "Furniture", "").len(), 1);
    }
}
