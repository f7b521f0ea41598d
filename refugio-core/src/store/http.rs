//! REST record store (Strapi-style collection API).
//!
//! Rows are flat camelCase objects wrapped in `{ "data": ... }`; the document id
//! is the stable key used for updates and deletes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::{RecordStore, ReservationFilter};
use crate::config::StoreConfig;
use crate::error::{RefugioError, RefugioResult};
use crate::interval::parse_date;
use crate::reservation::{
    GuestContact, PartyComposition, PaymentLink, ReservationInput, ReservationPatch,
    ReservationRecord, ReservationSource, ReservationStatus,
};

const COLLECTION: &str = "api/reservations";
const PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpRecordStore {
    pub fn new(config: &StoreConfig) -> RefugioResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(RefugioError::Config("store.base_url must be set".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefugioError::Store(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpRecordStore {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> RefugioResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RefugioError::Store(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Record store request failed");
            return Err(RefugioError::Store(format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RefugioError::Store(format!("Unexpected response: {}", e)))
    }
}

fn filter_query(filter: &ReservationFilter) -> Vec<(String, String)> {
    let mut query = vec![("sort".to_string(), "checkIn:asc".to_string())];

    if let Some(ref unit_id) = filter.unit_id {
        query.push(("filters[unitId][$eq]".into(), unit_id.clone()));
    }
    if let Some(status) = filter.status_not {
        query.push(("filters[status][$ne]".into(), status.as_str().into()));
    }
    if let Some(source) = filter.source {
        query.push(("filters[source][$eq]".into(), source.as_str().into()));
    }
    if let Some(ref payment_id) = filter.payment_id {
        query.push(("filters[paymentId][$eq]".into(), payment_id.clone()));
    }

    query
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self, filter: &ReservationFilter) -> RefugioResult<Vec<ReservationRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let mut query = filter_query(filter);
            query.push(("pagination[page]".into(), page.to_string()));
            query.push(("pagination[pageSize]".into(), PAGE_SIZE.to_string()));

            let response: Collection<serde_json::Value> = self
                .send(self.client.get(self.url(COLLECTION)).query(&query))
                .await?;

            for raw in response.data {
                match decode_row(raw) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(error = %e, "Skipping unreadable record store row"),
                }
            }

            let page_count = response
                .meta
                .and_then(|m| m.pagination)
                .map(|p| p.page_count)
                .unwrap_or(1);
            if page >= page_count {
                break;
            }
            page += 1;
        }

        // The store sorts already; keep the contract even if it doesn't.
        records.sort_by_key(|r: &ReservationRecord| r.check_in);
        Ok(records)
    }

    async fn create(&self, input: ReservationInput) -> RefugioResult<ReservationRecord> {
        input.validate()?;

        let body = Single {
            data: NewRow::from(&input),
        };
        let response: Single<StoreRow> = self
            .send(self.client.post(self.url(COLLECTION)).json(&body))
            .await?;

        response.data.try_into()
    }

    async fn update(&self, id: &str, patch: &ReservationPatch) -> RefugioResult<ReservationRecord> {
        let body = Single {
            data: PatchRow::from(patch),
        };
        let url = self.url(&format!("{}/{}", COLLECTION, id));
        let response: Single<StoreRow> = self.send(self.client.put(url).json(&body)).await?;

        response.data.try_into()
    }

    async fn delete(&self, id: &str) -> RefugioResult<()> {
        let url = self.url(&format!("{}/{}", COLLECTION, id));
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| RefugioError::Store(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RefugioError::Store(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Single<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    data: Vec<T>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreRow {
    document_id: String,
    unit_id: String,
    #[serde(deserialize_with = "store_date")]
    check_in: NaiveDate,
    #[serde(deserialize_with = "store_date")]
    check_out: NaiveDate,
    guest_name: String,
    #[serde(default)]
    guest_email: Option<String>,
    #[serde(default)]
    guest_phone: Option<String>,
    #[serde(default = "one")]
    adults: u32,
    #[serde(default)]
    children: u32,
    #[serde(default)]
    pets: u32,
    status: ReservationStatus,
    source: ReservationSource,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    reservation_code: Option<String>,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    payment_amount: Option<f64>,
    #[serde(default)]
    paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    special_requests: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn one() -> u32 {
    1
}

/// Stores may hand back date-only fields as full timestamps.
fn store_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

fn decode_row(raw: serde_json::Value) -> RefugioResult<ReservationRecord> {
    let row: StoreRow = serde_json::from_value(raw)
        .map_err(|e| RefugioError::Store(format!("Unexpected row: {}", e)))?;
    row.try_into()
}

impl TryFrom<StoreRow> for ReservationRecord {
    type Error = RefugioError;

    fn try_from(row: StoreRow) -> RefugioResult<Self> {
        if row.check_in >= row.check_out {
            return Err(RefugioError::Store(format!(
                "Record {} has check-in {} not before check-out {}",
                row.document_id, row.check_in, row.check_out
            )));
        }

        let payment = row.payment_id.map(|payment_id| PaymentLink {
            payment_id,
            amount: row.payment_amount.unwrap_or_default(),
            paid_at: row.paid_at,
        });

        Ok(ReservationRecord {
            id: row.document_id,
            unit_id: row.unit_id,
            check_in: row.check_in,
            check_out: row.check_out,
            guest: GuestContact {
                name: row.guest_name,
                email: row.guest_email,
                phone: row.guest_phone,
            },
            party: PartyComposition {
                adults: row.adults,
                children: row.children,
                pets: row.pets,
            },
            status: row.status,
            source: row.source,
            external_id: row.external_id,
            reservation_code: row.reservation_code,
            payment,
            special_requests: row.special_requests,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewRow<'a> {
    unit_id: &'a str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guest_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    guest_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guest_phone: Option<&'a str>,
    adults: u32,
    children: u32,
    pets: u32,
    status: ReservationStatus,
    source: ReservationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reservation_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_requests: Option<&'a str>,
}

impl<'a> From<&'a ReservationInput> for NewRow<'a> {
    fn from(input: &'a ReservationInput) -> Self {
        NewRow {
            unit_id: &input.unit_id,
            check_in: input.check_in,
            check_out: input.check_out,
            guest_name: &input.guest.name,
            guest_email: input.guest.email.as_deref(),
            guest_phone: input.guest.phone.as_deref(),
            adults: input.party.adults,
            children: input.party.children,
            pets: input.party.pets,
            status: input.status,
            source: input.source,
            external_id: input.external_id.as_deref(),
            reservation_code: input.reservation_code.as_deref(),
            payment_id: input.payment.as_ref().map(|p| p.payment_id.as_str()),
            payment_amount: input.payment.as_ref().map(|p| p.amount),
            paid_at: input.payment.as_ref().and_then(|p| p.paid_at),
            special_requests: input.special_requests.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    check_in: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_out: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guest_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adults: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ReservationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reservation_code: Option<&'a str>,
}

impl<'a> From<&'a ReservationPatch> for PatchRow<'a> {
    fn from(patch: &'a ReservationPatch) -> Self {
        PatchRow {
            check_in: patch.check_in,
            check_out: patch.check_out,
            guest_name: patch.guest_name.as_deref(),
            adults: patch.adults,
            status: patch.status,
            reservation_code: patch.reservation_code.as_deref(),
        }
    }
}
