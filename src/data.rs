use std::{fmt, path::PathBuf};

use chrono::{DateTime, Datelike, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CustomerId = String;
pub type InvoiceId = String;

/// Invoice amounts come in minor units (cents); the report wants euros.
pub const CURRENCY_SCALE: u32 = 2;

/// The filing is French, so months start at midnight in Paris and not in UTC.
pub const FILING_TZ: Tz = chrono_tz::Europe::Paris;

/// An invoice as returned by the billing provider. Only the fields the export
/// needs are kept; everything else in the payload is ignored by serde.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Invoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    /// Pre-tax amount in minor units. A missing subtotal counts as zero.
    #[serde(default)]
    pub subtotal: Option<i64>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    /// Unix timestamp of the invoice creation.
    pub created: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Invoice {
    pub fn amount(&self) -> i64 {
        self.subtotal.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Uncollectible,
    Void,
    #[serde(other)]
    Unknown,
}

/// The provider either gives us the customer id, or the whole customer object
/// when the listing was asked to expand it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum CustomerRef {
    Id(CustomerId),
    Expanded(Customer),
}

impl CustomerRef {
    pub fn id(&self) -> &str {
        match self {
            CustomerRef::Id(id) => id,
            CustomerRef::Expanded(customer) => &customer.id,
        }
    }
}

/// Customer snapshot. A deleted customer only carries its `id` and `deleted: true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Billing address.
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub shipping: Option<Shipping>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Address {
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Shipping {
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct TaxId {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// One page of a provider listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A calendar month of the filing time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn months_of(year: i32) -> impl Iterator<Item = Period> {
        (1..=12).map(move |month| Period { year, month })
    }

    /// `[start, end)` as Unix timestamps.
    pub fn bounds(&self) -> Result<(i64, i64), Error> {
        let start = month_start(self.year, self.month)?;
        let end = match self.month {
            12 => month_start(self.year + 1, 1)?,
            month => month_start(self.year, month + 1)?,
        };
        Ok((start, end))
    }

    pub fn containing(timestamp: i64) -> Option<Period> {
        let local = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&FILING_TZ);
        Some(Period {
            year: local.year(),
            month: local.month(),
        })
    }
}

fn month_start(year: i32, month: u32) -> Result<i64, Error> {
    FILING_TZ
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .earliest()
        .map(|start| start.timestamp())
        .ok_or(Error::InvalidPeriod { year, month })
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Per-customer running totals for the declaration. Like the rest of the
/// amounts in here the total is kept in cents, and only turned into a
/// `Decimal` in euros when we show it or serialize it (see `ReportRow`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ReportRow")]
pub(crate) struct AggregatedClient {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub country_code: String,
    pub country_name: &'static str,
    pub vat_number: Option<String>,
    pub total_cents: i64,
    pub invoice_count: u32,
}

impl AggregatedClient {
    pub fn total(&self) -> Decimal {
        Decimal::new(self.total_cents, CURRENCY_SCALE)
    }
}

/// Serialization proxy for `AggregatedClient`, in the column order of the report.
#[derive(Serialize)]
pub(crate) struct ReportRow {
    pub country_code: String,
    pub country_name: &'static str,
    pub vat_number: String,
    pub name: String,
    pub email: String,
    pub total: Decimal,
    pub invoice_count: u32,
}

impl From<AggregatedClient> for ReportRow {
    fn from(client: AggregatedClient) -> Self {
        Self {
            total: client.total(),
            country_code: client.country_code,
            country_name: client.country_name,
            vat_number: client.vat_number.unwrap_or_default(),
            name: client.name,
            email: client.email,
            invoice_count: client.invoice_count,
        }
    }
}

/// Everything that can go wrong during an export. Only some of these stop the
/// run, the others just mean "this invoice doesn't go in the declaration";
/// see `Error::is_fatal`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Billing provider unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Invoice {0} has no customer")]
    NoCustomer(InvoiceId),
    #[error("Customer {0} has neither a billing nor a shipping country")]
    UnresolvableCustomer(CustomerId),
    #[error("Customer {customer} is in {country}, not an intra-EU client")]
    OutsideEu { customer: CustomerId, country: String },
    #[error("Cannot write report to {}: {reason}", .path.display())]
    WriteError { path: PathBuf, reason: String },
    #[error("Invalid period {month:02}/{year}")]
    InvalidPeriod { year: i32, month: u32 },
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::SourceUnavailable(_) | Error::WriteError { .. } | Error::InvalidPeriod { .. } => {
                true
            }
            Error::NoCustomer(_) | Error::UnresolvableCustomer(_) | Error::OutsideEu { .. } => {
                false
            }
        }
    }
}
