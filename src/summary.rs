//! Human readable recap printed once the report is written. Nothing in here is
//! part of the declaration itself.

use std::{collections::BTreeMap, io};

use rust_decimal::Decimal;

use crate::{
    compute::Clients,
    countries,
    data::{AggregatedClient, Period},
};

const WIDE: usize = 70;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CountryTotal {
    pub code: String,
    pub name: &'static str,
    pub clients: usize,
    pub total: Decimal,
}

pub(crate) fn country_totals(clients: &Clients) -> Vec<CountryTotal> {
    let mut by_country: BTreeMap<&str, CountryTotal> = BTreeMap::new();
    for client in clients.clients.values() {
        let entry = by_country
            .entry(client.country_code.as_str())
            .or_insert_with(|| CountryTotal {
                code: client.country_code.clone(),
                name: client.country_name,
                clients: 0,
                total: Decimal::ZERO,
            });
        entry.clients += 1;
        entry.total += client.total();
    }
    by_country.into_values().collect()
}

fn grand_total<'a>(clients: impl IntoIterator<Item = &'a AggregatedClient>) -> Decimal {
    clients.into_iter().map(AggregatedClient::total).sum()
}

/// Cut `text` to `width` characters, marking the cut with "..".
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(2)).collect();
    cut.push_str("..");
    cut
}

fn euros(amount: Decimal) -> String {
    format!("{amount:.2}€")
}

fn client_row<W: io::Write>(out: &mut W, client: &AggregatedClient, name_width: usize) -> io::Result<()> {
    writeln!(
        out,
        "  {:<6} {:<name_width$} {:<18} {:>13}",
        client.country_code,
        truncate(&client.name, name_width),
        truncate(client.vat_number.as_deref().unwrap_or("-"), 18),
        euros(client.total()),
    )
}

fn print_month<W: io::Write>(
    out: &mut W,
    period: Period,
    fetched: usize,
    clients: Option<&Clients>,
) -> io::Result<()> {
    writeln!(out, "\n{}", "─".repeat(WIDE))?;
    writeln!(out, "  {period} ({fetched} factures)")?;
    writeln!(out, "{}", "─".repeat(WIDE))?;
    let Some(clients) = clients.filter(|clients| !clients.is_empty()) else {
        return writeln!(out, "  Aucun client intra-UE trouvé.");
    };
    writeln!(out, "  {:<6} {:<28} {:<18} {:>13}", "Pays", "Client", "TVA", "Montant HT")?;
    writeln!(out, "  {}", "-".repeat(WIDE - 4))?;
    let sorted = clients.sorted();
    for client in &sorted {
        client_row(out, client, 28)?;
    }
    writeln!(out, "  {}", "-".repeat(WIDE - 4))?;
    writeln!(
        out,
        "  {:<6} {:<47} {:>13}",
        "TOTAL",
        format!("{} client(s)", sorted.len()),
        euros(grand_total(sorted.iter().copied())),
    )
}

fn print_recap<W: io::Write>(out: &mut W, year: &Clients) -> io::Result<()> {
    writeln!(out, "\n{}", "=".repeat(WIDE))?;
    writeln!(out, "  RÉCAPITULATIF GLOBAL")?;
    writeln!(out, "{}", "=".repeat(WIDE))?;
    if year.is_empty() {
        return writeln!(out, "\n  Aucun client intra-UE trouvé sur la période.");
    }

    writeln!(out, "\n  TOTAUX PAR PAYS (hors {})", countries::DOMESTIC_COUNTRY)?;
    writeln!(out, "  {:<20} {:>8} {:>18}", "Pays", "Clients", "Montant HT")?;
    writeln!(out, "  {}", "-".repeat(48))?;
    for country in country_totals(year) {
        writeln!(
            out,
            "  {:<20} {:>8} {:>18}",
            format!("{} ({})", country.name, country.code),
            country.clients,
            euros(country.total)
        )?;
    }
    writeln!(out, "  {}", "-".repeat(48))?;
    let total = grand_total(year.clients.values());
    writeln!(out, "  {:<20} {:>8} {:>18}", "TOTAL", year.len(), euros(total))?;

    writeln!(out, "\n  LISTE DES CLIENTS ({})", year.len())?;
    writeln!(out, "  {:<6} {:<25} {:<18} {:>13}", "Pays", "Client", "TVA", "Montant HT")?;
    writeln!(out, "  {}", "-".repeat(WIDE - 4))?;
    for client in year.sorted() {
        client_row(out, client, 25)?;
    }
    writeln!(out, "  {}", "-".repeat(WIDE - 4))?;

    writeln!(out, "\n{}", "=".repeat(WIDE))?;
    writeln!(out, "  TOTAL GÉNÉRAL: {}", euros(total))?;
    writeln!(out, "{}", "=".repeat(WIDE))
}

/// Month by month detail, then the recap of the whole year.
pub(crate) fn print_summary<W: io::Write>(
    out: &mut W,
    fetched: &[(Period, usize)],
    months: &BTreeMap<Period, Clients>,
    year: &Clients,
) -> io::Result<()> {
    if let (Some((first, _)), Some((last, _))) = (fetched.first(), fetched.last()) {
        writeln!(out, "{}", "=".repeat(WIDE))?;
        writeln!(out, "  EXPORT DES - {first} → {last}")?;
        writeln!(out, "{}", "=".repeat(WIDE))?;
    }
    for (period, count) in fetched {
        print_month(out, *period, *count, months.get(period))?;
    }
    print_recap(out, year)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use crate::{
        compute::{Aggregator, Clients},
        data::Period,
        read::read_invoices,
        summary::{country_totals, print_summary, truncate, CountryTotal},
        testing::{customer, invoice, FakeBilling},
    };

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Société Générale Européenne", 10), "Société ..");
        assert_eq!(truncate("abcdef", 6), "abcdef");
    }

    fn billing() -> FakeBilling {
        FakeBilling::default()
            .with_customer(customer("cus_1", "Alpha", "DE"))
            .with_customer(customer("cus_2", "Beta", "DE"))
            .with_customer(customer("cus_3", "Gamma", "AT"))
            .with_invoices([
                invoice("in_1", "cus_1", 10000, 2024, 1),
                invoice("in_2", "cus_2", 2550, 2024, 1),
                invoice("in_3", "cus_3", 100, 2024, 6),
                invoice("in_4", "cus_1", 5000, 2024, 6),
            ])
    }

    #[test]
    fn test_country_totals() {
        let billing = billing();
        let mut aggregator = Aggregator::new(&billing);
        read_invoices(&billing, 2024, &mut aggregator).unwrap();
        assert_eq!(
            country_totals(&aggregator.year),
            [
                CountryTotal {
                    code: "AT".into(),
                    name: "Autriche",
                    clients: 1,
                    total: dec!(1.00),
                },
                CountryTotal {
                    code: "DE".into(),
                    name: "Allemagne",
                    clients: 2,
                    total: dec!(175.50),
                },
            ]
        );
    }

    #[test]
    fn test_print_summary() {
        let billing = billing();
        let mut aggregator = Aggregator::new(&billing);
        let fetched = read_invoices(&billing, 2024, &mut aggregator).unwrap();
        let mut out = Vec::new();
        print_summary(&mut out, &fetched, &aggregator.months, &aggregator.year).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("EXPORT DES - 01/2024 → 12/2024"));
        assert!(out.contains("01/2024 (2 factures)"));
        assert!(out.contains("02/2024 (0 factures)"));
        assert!(out.contains("LISTE DES CLIENTS (3)"));
        assert!(out.contains("TOTAL GÉNÉRAL: 176.50€"));
    }

    #[test]
    fn test_print_empty_summary() {
        let fetched: Vec<_> = Period::months_of(2024).map(|period| (period, 0)).collect();
        let mut out = Vec::new();
        print_summary(&mut out, &fetched, &BTreeMap::new(), &Clients::default()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Aucun client intra-UE trouvé.").count(), 12);
        assert!(out.contains("Aucun client intra-UE trouvé sur la période."));
    }
}
