/// Canonical project fields resolved from source columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    SiteName,
    District,
    Dun,
    Parliament,
    Latitude,
    Longitude,
    Status,
}

/// Accepted column labels per field, highest priority first.
///
/// Labels are compared case-insensitively after trimming.
pub const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::SiteName, &["SITE_NAME", "SITE NAME", "SITE"]),
    (CanonicalField::District, &["DISTRICT", "DAERAH"]),
    (CanonicalField::Dun, &["DUN"]),
    (CanonicalField::Parliament, &["PARLIAMENT", "PARLIMEN"]),
    (CanonicalField::Latitude, &["LATITUDE", "LAT"]),
    (CanonicalField::Longitude, &["LONGITUDE", "LNG", "LON"]),
    (CanonicalField::Status, &["STATUS"]),
];

impl CanonicalField {
    pub fn aliases(&self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

pub fn label_matches(label: &str, alias: &str) -> bool {
    label.trim().eq_ignore_ascii_case(alias)
}

/// `true` if `label` is an alias of any canonical field.
pub fn is_canonical_label(label: &str) -> bool {
    FIELD_ALIASES
        .iter()
        .flat_map(|(_, aliases)| aliases.iter())
        .any(|alias| label_matches(label, alias))
}
