/// Country we file from; its clients are never part of the declaration.
pub const DOMESTIC_COUNTRY: &str = "FR";

/// EU member states other than France (ISO 3166-1 alpha-2), with the names the
/// declaration uses.
pub const EU_COUNTRIES: [(&str, &str); 26] = [
    ("AT", "Autriche"),
    ("BE", "Belgique"),
    ("BG", "Bulgarie"),
    ("CY", "Chypre"),
    ("CZ", "Tchéquie"),
    ("DE", "Allemagne"),
    ("DK", "Danemark"),
    ("EE", "Estonie"),
    ("ES", "Espagne"),
    ("FI", "Finlande"),
    ("GR", "Grèce"),
    ("HR", "Croatie"),
    ("HU", "Hongrie"),
    ("IE", "Irlande"),
    ("IT", "Italie"),
    ("LT", "Lituanie"),
    ("LU", "Luxembourg"),
    ("LV", "Lettonie"),
    ("MT", "Malte"),
    ("NL", "Pays-Bas"),
    ("PL", "Pologne"),
    ("PT", "Portugal"),
    ("RO", "Roumanie"),
    ("SE", "Suède"),
    ("SI", "Slovénie"),
    ("SK", "Slovaquie"),
];

/// Returns the display name of `code` if a client from there belongs in the
/// declaration, `None` otherwise.
pub(crate) fn admit(code: &str) -> Option<&'static str> {
    let code = code.trim().to_ascii_uppercase();
    if code == DOMESTIC_COUNTRY {
        return None;
    }
    EU_COUNTRIES
        .iter()
        .find(|(eu, _)| *eu == code)
        .map(|(_, name)| *name)
}
