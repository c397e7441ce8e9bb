use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::{
    countries,
    data::{AggregatedClient, CustomerId, Error, Invoice, Period},
    read::InvoiceUser,
    resolve::{CustomerApi, Resolver},
};

/// The only currency the declaration is made in.
pub const REPORT_CURRENCY: &str = "eur";

/// Intra-EU clients with their running totals, created on the fly when reading
/// the invoices. Single-threaded, one per run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Clients {
    pub clients: HashMap<CustomerId, AggregatedClient>,
}

impl Clients {
    /// Add one invoice of `amount` cents to the record of `client`, creating
    /// the record from `client` the first time the customer shows up.
    fn add(&mut self, client: &AggregatedClient, amount: i64) {
        let record = self
            .clients
            .entry(client.customer_id.clone())
            .or_insert_with(|| client.clone());
        record.total_cents += amount;
        record.invoice_count += 1;
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Report order: country code, then name, then customer id so that two
    /// homonyms always come out the same way.
    pub fn sorted(&self) -> Vec<&AggregatedClient> {
        let mut clients: Vec<_> = self.clients.values().collect();
        clients.sort_by(|a, b| {
            (&a.country_code, &a.name, &a.customer_id).cmp(&(&b.country_code, &b.name, &b.customer_id))
        });
        clients
    }
}

/// This is where the business logic stands: every invoice goes through the
/// resolver and the EU filter, and what survives is summed per customer, for
/// the year and for the month the invoice was issued in.
pub(crate) struct Aggregator<'a, A: CustomerApi> {
    resolver: Resolver<'a, A>,
    pub year: Clients,
    pub months: BTreeMap<Period, Clients>,
}

impl<'a, A: CustomerApi> Aggregator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            resolver: Resolver::new(api),
            year: Clients::default(),
            months: BTreeMap::new(),
        }
    }
}

impl<A: CustomerApi> InvoiceUser for Aggregator<'_, A> {
    fn use_invoice(&mut self, invoice: Invoice) -> Result<(), Error> {
        let reference = invoice
            .customer
            .as_ref()
            .ok_or_else(|| Error::NoCustomer(invoice.id.clone()))?;
        let customer = self.resolver.resolve(reference)?;
        let country_name =
            countries::admit(&customer.country_code).ok_or_else(|| Error::OutsideEu {
                customer: customer.id.clone(),
                country: customer.country_code.clone(),
            })?;
        if let Some(currency) = invoice.currency.as_deref() {
            if !currency.eq_ignore_ascii_case(REPORT_CURRENCY) {
                // FIXME: amounts are summed as if they were euros; converting
                // would need the exchange rate at the invoice date.
                warn!(invoice = %invoice.id, currency, "invoice not in EUR, amount taken as is");
            }
        }
        let client = AggregatedClient {
            vat_number: self.resolver.vat_number(&customer.id),
            customer_id: customer.id,
            name: customer.name,
            email: customer.email,
            country_code: customer.country_code,
            country_name,
            total_cents: 0,
            invoice_count: 0,
        };
        let amount = invoice.amount();
        self.year.add(&client, amount);
        if let Some(period) = Period::containing(invoice.created) {
            self.months.entry(period).or_default().add(&client, amount);
        }
        Ok(())
    }
}
