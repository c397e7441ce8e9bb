use std::collections::HashMap;

use tracing::{debug, warn};

use crate::data::{Customer, CustomerId, CustomerRef, Error, TaxId};

/// Tax id type the provider uses for intra-community VAT numbers.
pub const EU_VAT: &str = "eu_vat";

/// Customer lookups on the billing provider.
pub(crate) trait CustomerApi {
    fn customer(&self, id: &str) -> Result<Customer, Error>;
    fn tax_ids(&self, customer: &str) -> Result<Vec<TaxId>, Error>;
}

/// What the declaration needs to know about a customer, besides its VAT number
/// which is looked up separately (and only for the customers that matter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub country_code: String,
}

/// Billing address country first, shipping address country otherwise. Blank
/// codes don't count.
pub(crate) fn resolve_country(billing: Option<&str>, shipping: Option<&str>) -> Option<String> {
    [billing, shipping]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
}

/// First registered EU VAT number, in the order the provider lists them.
pub(crate) fn first_eu_vat(tax_ids: &[TaxId]) -> Option<String> {
    tax_ids
        .iter()
        .find(|tax_id| tax_id.kind == EU_VAT)
        .map(|tax_id| tax_id.value.clone())
}

fn resolve_customer(customer: &Customer) -> Option<ResolvedCustomer> {
    if customer.deleted {
        return None;
    }
    let billing = customer.address.as_ref().and_then(|a| a.country.as_deref());
    let shipping = customer
        .shipping
        .as_ref()
        .and_then(|s| s.address.as_ref())
        .and_then(|a| a.country.as_deref());
    Some(ResolvedCustomer {
        id: customer.id.clone(),
        name: customer.name.clone().unwrap_or_default(),
        email: customer.email.clone().unwrap_or_default(),
        country_code: resolve_country(billing, shipping)?,
    })
}

/// Resolves customers, remembering the answers for the whole run: a client
/// with fifty invoices is only looked up once.
pub(crate) struct Resolver<'a, A: CustomerApi> {
    api: &'a A,
    customers: HashMap<CustomerId, Option<ResolvedCustomer>>,
    vat_numbers: HashMap<CustomerId, Option<String>>,
}

impl<'a, A: CustomerApi> Resolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            customers: HashMap::new(),
            vat_numbers: HashMap::new(),
        }
    }

    /// Expanded customers are used as-is, bare ids are fetched. A customer
    /// without any country (or deleted) is `UnresolvableCustomer`; failing to
    /// reach the provider is `SourceUnavailable`.
    pub fn resolve(&mut self, reference: &CustomerRef) -> Result<ResolvedCustomer, Error> {
        let id = reference.id();
        let resolved = match self.customers.get(id) {
            Some(cached) => cached.clone(),
            None => {
                let resolved = match reference {
                    CustomerRef::Expanded(customer) => resolve_customer(customer),
                    CustomerRef::Id(id) => {
                        debug!(customer = %id, "fetching customer");
                        resolve_customer(&self.api.customer(id)?)
                    }
                };
                self.customers.insert(id.to_owned(), resolved.clone());
                resolved
            }
        };
        resolved.ok_or_else(|| Error::UnresolvableCustomer(id.to_owned()))
    }

    /// A failed tax id lookup only costs us the VAT number, not the client.
    pub fn vat_number(&mut self, customer: &str) -> Option<String> {
        if let Some(cached) = self.vat_numbers.get(customer) {
            return cached.clone();
        }
        let vat_number = match self.api.tax_ids(customer) {
            Ok(tax_ids) => first_eu_vat(&tax_ids),
            Err(e) => {
                warn!(customer, "no VAT number: {e}");
                None
            }
        };
        self.vat_numbers.insert(customer.to_owned(), vat_number.clone());
        vat_number
    }
}
