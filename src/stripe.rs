//! Blocking client for the Stripe REST API, restricted to what the export reads.

use std::{thread, time::Duration};

use reqwest::{blocking::Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::{
    data::{Customer, Error, Invoice, List, Period, TaxId},
    read::{InvoiceApi, PAGE_SIZE},
    resolve::CustomerApi,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Retries after the first attempt, for network errors and the statuses
/// Stripe documents as safe to retry.
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const TIMEOUT: Duration = Duration::from_secs(80);
const TAX_ID_LIMIT: u32 = 10;

pub(crate) struct StripeClient {
    http: Client,
    api_base: String,
    api_key: String,
    max_retries: u32,
    backoff: Duration,
}

enum Failure {
    Transient(String),
    Permanent(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(api_key: &str, api_base: &str) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            max_retries: MAX_RETRIES,
            backoff: INITIAL_BACKOFF,
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error> {
        let url = format!("{}{path}", self.api_base);
        let mut attempt = 0;
        loop {
            match self.try_get(&url, query) {
                Ok(value) => return Ok(value),
                Err(Failure::Transient(reason)) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff * 2u32.pow(attempt - 1);
                    warn!(%url, attempt, "{reason}, retrying in {delay:?}");
                    thread::sleep(delay);
                }
                Err(Failure::Transient(reason) | Failure::Permanent(reason)) => {
                    return Err(Error::SourceUnavailable(reason))
                }
            }
        }
    }

    fn try_get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, Failure> {
        debug!(%url, ?query, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .map_err(|e| Failure::Transient(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Failure::Transient(e.to_string()))?;
        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| Failure::Permanent(format!("unexpected response from {url}: {e}")));
        }
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or(body);
        let reason = format!("HTTP {status}: {message}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Failure::Permanent(format!("credentials rejected ({reason})")))
            }
            StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => Err(Failure::Transient(reason)),
            status if status.is_server_error() => Err(Failure::Transient(reason)),
            _ => Err(Failure::Permanent(reason)),
        }
    }
}

impl InvoiceApi for StripeClient {
    fn paid_invoices_page(
        &self,
        period: Period,
        starting_after: Option<&str>,
    ) -> Result<List<Invoice>, Error> {
        let (start, end) = period.bounds()?;
        let mut query = vec![
            ("status", "paid".to_owned()),
            ("created[gte]", start.to_string()),
            ("created[lt]", end.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("expand[]", "data.customer".to_owned()),
        ];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor.to_owned()));
        }
        self.get("/v1/invoices", &query)
    }
}

impl CustomerApi for StripeClient {
    fn customer(&self, id: &str) -> Result<Customer, Error> {
        self.get(&format!("/v1/customers/{id}"), &[])
    }

    fn tax_ids(&self, customer: &str) -> Result<Vec<TaxId>, Error> {
        let list: List<TaxId> = self.get(
            &format!("/v1/customers/{customer}/tax_ids"),
            &[("limit", TAX_ID_LIMIT.to_string())],
        )?;
        Ok(list.data)
    }
}
