//! In-memory billing provider for the tests.

use std::{cell::Cell, collections::HashMap};

use crate::{
    data::{Address, Customer, CustomerRef, Error, Invoice, InvoiceStatus, List, Period, TaxId},
    read::InvoiceApi,
    resolve::CustomerApi,
};

pub(crate) struct FakeBilling {
    invoices: Vec<Invoice>,
    customers: HashMap<String, Customer>,
    tax_ids: HashMap<String, Vec<TaxId>>,
    page_size: usize,
    failing_tax_ids: bool,
    page_requests: Cell<usize>,
    customer_requests: Cell<usize>,
    tax_id_requests: Cell<usize>,
}

impl Default for FakeBilling {
    fn default() -> Self {
        Self {
            invoices: Vec::new(),
            customers: HashMap::new(),
            tax_ids: HashMap::new(),
            page_size: 100,
            failing_tax_ids: false,
            page_requests: Cell::new(0),
            customer_requests: Cell::new(0),
            tax_id_requests: Cell::new(0),
        }
    }
}

impl FakeBilling {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_invoices(mut self, invoices: impl IntoIterator<Item = Invoice>) -> Self {
        self.invoices.extend(invoices);
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customers.insert(customer.id.clone(), customer);
        self
    }

    pub fn with_tax_ids(mut self, customer: &str, tax_ids: Vec<TaxId>) -> Self {
        self.tax_ids.insert(customer.into(), tax_ids);
        self
    }

    pub fn failing_tax_ids(mut self) -> Self {
        self.failing_tax_ids = true;
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.get()
    }

    pub fn customer_requests(&self) -> usize {
        self.customer_requests.get()
    }

    pub fn tax_id_requests(&self) -> usize {
        self.tax_id_requests.get()
    }
}

impl InvoiceApi for FakeBilling {
    fn paid_invoices_page(
        &self,
        period: Period,
        starting_after: Option<&str>,
    ) -> Result<List<Invoice>, Error> {
        self.page_requests.set(self.page_requests.get() + 1);
        let (start, end) = period.bounds()?;
        let in_period: Vec<_> = self
            .invoices
            .iter()
            .filter(|invoice| (start..end).contains(&invoice.created))
            .collect();
        let first = match starting_after {
            Some(cursor) => in_period
                .iter()
                .position(|invoice| invoice.id == cursor)
                .map_or(in_period.len(), |position| position + 1),
            None => 0,
        };
        let rest = &in_period[first..];
        let page = &rest[..rest.len().min(self.page_size)];
        Ok(List {
            data: page.iter().map(|invoice| (*invoice).clone()).collect(),
            has_more: rest.len() > page.len(),
        })
    }
}

impl CustomerApi for FakeBilling {
    fn customer(&self, id: &str) -> Result<Customer, Error> {
        self.customer_requests.set(self.customer_requests.get() + 1);
        self.customers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SourceUnavailable(format!("No such customer: '{id}'")))
    }

    fn tax_ids(&self, customer: &str) -> Result<Vec<TaxId>, Error> {
        self.tax_id_requests.set(self.tax_id_requests.get() + 1);
        if self.failing_tax_ids {
            return Err(Error::SourceUnavailable("HTTP 500".into()));
        }
        Ok(self.tax_ids.get(customer).cloned().unwrap_or_default())
    }
}

/// A paid invoice created on the 15th of the given month.
pub(crate) fn invoice(id: &str, customer: &str, subtotal: i64, year: i32, month: u32) -> Invoice {
    let (start, _) = Period { year, month }.bounds().unwrap();
    Invoice {
        id: id.into(),
        customer: Some(CustomerRef::Id(customer.into())),
        subtotal: Some(subtotal),
        status: Some(InvoiceStatus::Paid),
        created: start + 14 * 86_400,
        currency: Some("eur".into()),
    }
}

/// A customer with a billing address in `country`.
pub(crate) fn customer(id: &str, name: &str, country: &str) -> Customer {
    Customer {
        id: id.into(),
        name: Some(name.into()),
        email: Some(format!("{id}@example.com")),
        address: Some(Address {
            country: Some(country.into()),
        }),
        ..Customer::default()
    }
}
