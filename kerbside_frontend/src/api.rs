use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::models::{
    AuthUser, Category, Donation, Favorite, Listing, ListingImage, NewDonation, NewListing,
    NewListingImage, NewSpecification, NewTransaction, Profile, Session, Specification,
    Transaction, TransactionStatus,
};

/// Columns fetched for catalog rows: the listing plus its embedded image rows,
/// so cards can show a thumbnail without a second round trip.
const LISTING_EMBED: &str = "*,listing_images(url,is_primary,display_order,alt_text)";

lazy_static! {
    static ref PROBE_CLIENT: std::result::Result<Client, String> = Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|err| err.to_string());
}

/// Plain shared client for fetching third-party image URLs. Service headers
/// must not leak to arbitrary hosts, so this is separate from `ApiClient`.
pub fn probe_client() -> Result<&'static Client> {
    match &*PROBE_CLIENT {
        Ok(client) => Ok(client),
        Err(err) => Err(anyhow!("HTTP client unavailable: {err}")),
    }
}

/// Filter/order/limit composition for one table read or write, rendered into
/// the service's query-parameter dialect (`col=eq.v`, `order=col.desc`, ...).
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            params: vec![("select".to_string(), "*".to_string())],
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        // The constructor guarantees params[0] is the select clause.
        self.params[0].1 = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn neq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.to_string(), format!("neq.{value}")));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        self.params
            .push((column.to_string(), format!("in.({})", values.join(","))));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{column}.asc")));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{column}.desc")));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.params.push(("limit".to_string(), count.to_string()));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    client: Client,
    session: Arc<RwLock<Option<Session>>>,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let base_url = sanitize_base_url(config.api_url.clone())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            client,
            session: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> Result<()> {
        self.base_url = sanitize_base_url(base_url.into())?;
        Ok(())
    }

    // ---- session ----

    pub fn set_session(&self, session: Option<Session>) {
        if let Ok(mut slot) = self.session.write() {
            *slot = session;
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|slot| slot.clone())
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session().map(|session| session.user)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }

    // ---- auth collaborator ----

    /// Registers a new account. Returns `None` when the service defers the
    /// session until the address is confirmed.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile_fields: &Value,
    ) -> Result<Option<Session>> {
        let url = self.service_url("/auth/v1/signup")?;
        let body = json!({
            "email": email,
            "password": password,
            "data": profile_fields,
        });
        let response = self
            .request(Method::POST, url)
            .json(&body)
            .send()?
            .error_for_status()?;
        let raw: Value = response.json()?;
        if raw.get("access_token").is_some() {
            let session: Session = serde_json::from_value(raw)?;
            self.set_session(Some(session.clone()));
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.service_url("/auth/v1/token?grant_type=password")?;
        let response = self
            .request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }))
            .send()?
            .error_for_status()
            .context("sign-in rejected")?;
        let session: Session = response.json()?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// OAuth runs in the system browser; the service redirects back to its
    /// own hosted flow.
    pub fn oauth_authorize_url(&self, provider: &str) -> String {
        format!("{}/auth/v1/authorize?provider={provider}", self.base_url)
    }

    /// Clears the local session even when the revocation call fails.
    pub fn sign_out(&self) -> Result<()> {
        let url = self.service_url("/auth/v1/logout")?;
        let result = self
            .request(Method::POST, url)
            .send()
            .and_then(|response| response.error_for_status());
        self.set_session(None);
        result.map(|_| ()).context("sign-out request failed")
    }

    pub fn request_password_reset(&self, email: &str) -> Result<()> {
        let url = self.service_url("/auth/v1/recover")?;
        self.request(Method::POST, url)
            .json(&json!({ "email": email }))
            .send()?
            .error_for_status()?;
        Ok(())
    }

    pub fn update_password(&self, new_password: &str) -> Result<()> {
        let url = self.service_url("/auth/v1/user")?;
        self.request(Method::PUT, url)
            .json(&json!({ "password": new_password }))
            .send()?
            .error_for_status()?;
        Ok(())
    }

    pub fn fetch_user(&self) -> Result<AuthUser> {
        let url = self.service_url("/auth/v1/user")?;
        let response = self.request(Method::GET, url).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    // ---- data collaborator: generic table operations ----

    pub fn fetch_rows<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
        let url = self.rest_url(query)?;
        let response = self.request(Method::GET, url).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    pub fn fetch_optional<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Option<T>> {
        let mut rows = self.fetch_rows::<T>(query)?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    pub fn insert_rows<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<()> {
        let url = self.service_url(&format!("/rest/v1/{table}"))?;
        self.request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    pub fn insert_returning<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        rows: &T,
    ) -> Result<Vec<R>> {
        let url = self.service_url(&format!("/rest/v1/{table}"))?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    pub fn upsert_rows<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<()> {
        let url = self.service_url(&format!("/rest/v1/{table}"))?;
        self.request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    pub fn patch_rows(&self, query: &TableQuery, patch: &Value) -> Result<()> {
        let url = self.rest_url(query)?;
        self.request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    pub fn delete_rows(&self, query: &TableQuery) -> Result<()> {
        let url = self.rest_url(query)?;
        self.request(Method::DELETE, url).send()?.error_for_status()?;
        Ok(())
    }

    /// Invoke a named server-side procedure.
    pub fn rpc(&self, name: &str, args: &Value) -> Result<()> {
        let url = self.service_url(&format!("/rest/v1/rpc/{name}"))?;
        self.request(Method::POST, url)
            .json(args)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    // ---- data collaborator: marketplace tables ----

    pub fn list_available_listings(&self) -> Result<Vec<Listing>> {
        let query = TableQuery::new("listings")
            .select(LISTING_EMBED)
            .eq("status", "available")
            .order_desc("created_at");
        self.fetch_rows(&query)
    }

    pub fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let query = TableQuery::new("listings")
            .select(LISTING_EMBED)
            .eq("id", listing_id);
        self.fetch_optional(&query)
    }

    pub fn list_listings_for_seller(&self, seller_id: &str) -> Result<Vec<Listing>> {
        let query = TableQuery::new("listings")
            .select(LISTING_EMBED)
            .eq("seller_id", seller_id)
            .order_desc("created_at");
        self.fetch_rows(&query)
    }

    pub fn list_listings_by_ids(&self, ids: &[String]) -> Result<Vec<Listing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new("listings")
            .select(LISTING_EMBED)
            .in_list("id", ids)
            .order_desc("created_at");
        self.fetch_rows(&query)
    }

    pub fn similar_listings(
        &self,
        category_id: &str,
        exclude_listing_id: &str,
        limit: usize,
    ) -> Result<Vec<Listing>> {
        let query = TableQuery::new("listings")
            .select(LISTING_EMBED)
            .eq("category_id", category_id)
            .neq("id", exclude_listing_id)
            .eq("status", "available")
            .order_desc("created_at")
            .limit(limit);
        self.fetch_rows(&query)
    }

    pub fn insert_listing(&self, listing: &NewListing) -> Result<Listing> {
        let mut rows: Vec<Listing> = self.insert_returning("listings", &[listing])?;
        rows.pop().context("service returned no listing row")
    }

    pub fn update_listing(&self, listing_id: &str, patch: &Value) -> Result<()> {
        self.patch_rows(&TableQuery::new("listings").eq("id", listing_id), patch)
    }

    pub fn delete_listing(&self, listing_id: &str) -> Result<()> {
        self.delete_rows(&TableQuery::new("listings").eq("id", listing_id))
    }

    pub fn list_listing_images(&self, listing_id: &str) -> Result<Vec<ListingImage>> {
        let query = TableQuery::new("listing_images")
            .eq("listing_id", listing_id)
            .order_asc("display_order");
        self.fetch_rows(&query)
    }

    /// Destructive replace: prior rows are dropped and the new ordered set is
    /// inserted, matching the submission pipeline's contract.
    pub fn replace_listing_images(
        &self,
        listing_id: &str,
        rows: &[NewListingImage],
    ) -> Result<()> {
        self.delete_rows(&TableQuery::new("listing_images").eq("listing_id", listing_id))?;
        if rows.is_empty() {
            return Ok(());
        }
        self.insert_rows("listing_images", rows)
    }

    pub fn list_specifications(&self, listing_id: &str) -> Result<Vec<Specification>> {
        let query = TableQuery::new("specifications").eq("listing_id", listing_id);
        self.fetch_rows(&query)
    }

    pub fn replace_specifications(
        &self,
        listing_id: &str,
        rows: &[NewSpecification],
    ) -> Result<()> {
        self.delete_rows(&TableQuery::new("specifications").eq("listing_id", listing_id))?;
        if rows.is_empty() {
            return Ok(());
        }
        self.insert_rows("specifications", rows)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let query = TableQuery::new("categories").order_asc("name");
        self.fetch_rows(&query)
    }

    pub fn list_available_donations(&self) -> Result<Vec<Donation>> {
        let query = TableQuery::new("donations").order_desc("created_at");
        self.fetch_rows(&query)
    }

    pub fn insert_donation(&self, donation: &NewDonation) -> Result<Donation> {
        let mut rows: Vec<Donation> = self.insert_returning("donations", &[donation])?;
        rows.pop().context("service returned no donation row")
    }

    pub fn claim_donation(&self, donation_id: &str) -> Result<()> {
        self.patch_rows(
            &TableQuery::new("donations").eq("id", donation_id),
            &json!({ "status": "claimed" }),
        )
    }

    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let query = TableQuery::new("favorites").eq("user_id", user_id);
        self.fetch_rows(&query)
    }

    pub fn add_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        self.insert_rows(
            "favorites",
            &[Favorite {
                user_id: user_id.to_string(),
                listing_id: listing_id.to_string(),
            }],
        )
    }

    pub fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<()> {
        self.delete_rows(
            &TableQuery::new("favorites")
                .eq("user_id", user_id)
                .eq("listing_id", listing_id),
        )
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.fetch_optional(&TableQuery::new("profiles").eq("id", user_id))
    }

    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.upsert_rows("profiles", &[profile])
    }

    pub fn insert_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let mut rows: Vec<Transaction> = self.insert_returning("transactions", &[transaction])?;
        rows.pop().context("service returned no transaction row")
    }

    pub fn list_pending_transactions(&self) -> Result<Vec<Transaction>> {
        let query = TableQuery::new("transactions")
            .eq("status", "pending")
            .order_desc("created_at");
        self.fetch_rows(&query)
    }

    pub fn set_transaction_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<()> {
        self.patch_rows(
            &TableQuery::new("transactions").eq("id", transaction_id),
            &json!({ "status": status }),
        )
    }

    // ---- named atomic counters ----

    pub fn increment_view_count(&self, listing_id: &str) -> Result<()> {
        self.rpc("increment_view_count", &json!({ "listing_id": listing_id }))
    }

    pub fn increment_favorites(&self, listing_id: &str) -> Result<()> {
        self.rpc("increment_favorites", &json!({ "listing_id": listing_id }))
    }

    pub fn decrement_favorites(&self, listing_id: &str) -> Result<()> {
        self.rpc("decrement_favorites", &json!({ "listing_id": listing_id }))
    }

    // ---- storage collaborator ----

    /// Uploads an object and returns its public URL.
    pub fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let url = self.service_url(&format!("/storage/v1/object/{bucket}/{path}"))?;
        self.request(Method::POST, url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()?
            .error_for_status()
            .with_context(|| format!("upload to bucket {bucket} failed"))?;
        Ok(self.public_object_url(bucket, path))
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    pub fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let url = self.service_url("/storage/v1/bucket")?;
        let response = self.request(Method::GET, url).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    // ---- internals ----

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.api_key.clone());
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(bearer)
    }

    fn rest_url(&self, query: &TableQuery) -> Result<Url> {
        let mut url = self.service_url(&format!("/rest/v1/{}", query.table()))?;
        url.query_pairs_mut()
            .extend_pairs(query.params().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(url)
    }

    fn service_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{path}", self.base_url)).context("invalid service URL")
    }
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn offline_client() -> ApiClient {
        ApiClient::new(&AppConfig {
            api_url: "http://service.test".into(),
            api_key: "anon-key".into(),
            checkout_url: None,
        })
        .expect("client")
    }

    #[test]
    fn query_composes_filters_in_order() {
        let query = TableQuery::new("listings")
            .eq("status", "available")
            .neq("id", "l9")
            .order_desc("created_at")
            .limit(8);
        let expected: Vec<(String, String)> = vec![
            ("select".into(), "*".into()),
            ("status".into(), "eq.available".into()),
            ("id".into(), "neq.l9".into()),
            ("order".into(), "created_at.desc".into()),
            ("limit".into(), "8".into()),
        ];
        assert_eq!(query.params(), expected.as_slice());
    }

    #[test]
    fn select_replaces_the_default_columns() {
        let query = TableQuery::new("listings").select("id,title");
        assert_eq!(query.params()[0], ("select".to_string(), "id,title".to_string()));
    }

    #[test]
    fn in_list_joins_ids() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let query = TableQuery::new("listings").in_list("id", &ids);
        assert_eq!(query.params()[1].1, "in.(a,b)");
    }

    #[test]
    fn rest_url_renders_the_query_dialect() {
        let api = offline_client();
        let query = TableQuery::new("listings")
            .eq("status", "available")
            .order_desc("created_at")
            .limit(8);
        let url = api.rest_url(&query).expect("url");
        assert_eq!(url.path(), "/rest/v1/listings");
        let rendered = url.query().expect("query string");
        assert!(rendered.contains("status=eq.available"));
        assert!(rendered.contains("order=created_at.desc"));
        assert!(rendered.contains("limit=8"));
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            sanitize_base_url("service.test/".into()).expect("sanitized"),
            "http://service.test"
        );
        assert_eq!(
            sanitize_base_url("https://service.test///".into()).expect("sanitized"),
            "https://service.test"
        );
    }

    #[test]
    fn public_object_url_points_into_the_bucket() {
        let api = offline_client();
        assert_eq!(
            api.public_object_url("listing-images", "l1/a.jpg"),
            "http://service.test/storage/v1/object/public/listing-images/l1/a.jpg"
        );
    }

    #[test]
    fn session_is_shared_across_clones() {
        let api = offline_client();
        let clone = api.clone();
        api.set_session(Some(Session {
            access_token: "tok".into(),
            refresh_token: None,
            user: AuthUser {
                id: "u1".into(),
                email: "a@b.c".into(),
            },
        }));
        assert!(clone.is_signed_in());
        clone.set_session(None);
        assert!(!api.is_signed_in());
    }
}
