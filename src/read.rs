use std::vec;

use tracing::{debug, info, warn};

use crate::data::{Error, Invoice, InvoiceStatus, List, Period};

/// Page size asked to the provider; 100 is the maximum it accepts.
pub const PAGE_SIZE: u32 = 100;

/// Paginated access to the paid invoices of a period. Implemented by the HTTP
/// client, and by an in-memory fake in the tests.
pub(crate) trait InvoiceApi {
    /// Fetch one page of paid invoices created within `period`, starting right
    /// after the invoice `starting_after` if given.
    fn paid_invoices_page(
        &self,
        period: Period,
        starting_after: Option<&str>,
    ) -> Result<List<Invoice>, Error>;
}

/// Trait for doing something with an `Invoice` fetched from the provider. Used
/// by the aggregation, but also by tests to check what the source yields.
pub(crate) trait InvoiceUser {
    fn use_invoice(&mut self, invoice: Invoice) -> Result<(), Error>;
}

/// Lazy iterator over the paid invoices of a period; the next page is only
/// requested once the current one is consumed. Iterating again means calling
/// `paid_invoices` again, which starts back from the first page.
pub(crate) struct PaidInvoices<'a, A: InvoiceApi> {
    api: &'a A,
    period: Period,
    page: vec::IntoIter<Invoice>,
    cursor: Option<String>,
    has_more: bool,
}

pub(crate) fn paid_invoices<A: InvoiceApi>(api: &A, period: Period) -> PaidInvoices<'_, A> {
    PaidInvoices {
        api,
        period,
        page: Vec::new().into_iter(),
        cursor: None,
        has_more: true,
    }
}

impl<A: InvoiceApi> Iterator for PaidInvoices<'_, A> {
    type Item = Result<Invoice, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(invoice) = self.page.next() {
                // The listing is already filtered, but it costs nothing to be sure.
                if invoice.status.is_some_and(|status| status != InvoiceStatus::Paid) {
                    debug!(invoice = %invoice.id, status = ?invoice.status, "skipping unpaid invoice");
                    continue;
                }
                return Some(Ok(invoice));
            }
            if !self.has_more {
                return None;
            }
            match self.api.paid_invoices_page(self.period, self.cursor.as_deref()) {
                Ok(list) => {
                    // An empty page claiming there's more would loop forever.
                    self.has_more = list.has_more && !list.data.is_empty();
                    if let Some(last) = list.data.last() {
                        self.cursor = Some(last.id.clone());
                    }
                    self.page = list.data.into_iter();
                }
                Err(e) => {
                    self.has_more = false;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Feed every paid invoice of `year` to `user`, month after month. Invoices the
/// user refuses for a non-fatal reason are logged and skipped; anything fatal
/// ends the run. Returns how many invoices were fetched for each month.
pub(crate) fn read_invoices<A: InvoiceApi, U: InvoiceUser>(
    api: &A,
    year: i32,
    user: &mut U,
) -> Result<Vec<(Period, usize)>, Error> {
    let mut fetched = Vec::with_capacity(12);
    for period in Period::months_of(year) {
        period.bounds()?;
        let mut count = 0;
        for invoice in paid_invoices(api, period) {
            let invoice = invoice?;
            count += 1;
            let id = invoice.id.clone();
            match user.use_invoice(invoice) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e @ Error::OutsideEu { .. }) => debug!(invoice = %id, "{e}"),
                Err(e) => warn!(invoice = %id, "skipped: {e}"),
            }
        }
        info!(month = %period, invoices = count, "fetched");
        fetched.push((period, count));
    }
    Ok(fetched)
}
