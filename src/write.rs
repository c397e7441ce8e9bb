use std::{fs, io, path::Path};

use crate::data::{AggregatedClient, Error};

/// Column titles expected by the declaration, in `ReportRow` order.
pub const HEADER: [&str; 7] = [
    "Code Pays",
    "Pays",
    "Numéro TVA",
    "Nom Client",
    "Email",
    "Montant HT (EUR)",
    "Nb Factures",
];

/// Semicolon separated exporter for the aggregated clients, in the given order.
/// The header is always written, even when there's nobody to declare.
pub(crate) fn write_report<'a, W: io::Write>(
    writer: W,
    clients: impl IntoIterator<Item = &'a AggregatedClient>,
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER)?;
    for client in clients {
        wtr.serialize(client)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the report to `path`, creating its directory if needed.
pub(crate) fn export_report<'a>(
    path: &Path,
    clients: impl IntoIterator<Item = &'a AggregatedClient>,
) -> Result<(), Error> {
    let write_error = |reason: String| Error::WriteError {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
    }
    let file = fs::File::create(path).map_err(|e| write_error(e.to_string()))?;
    write_report(io::BufWriter::new(file), clients).map_err(|e| write_error(e.to_string()))
}
