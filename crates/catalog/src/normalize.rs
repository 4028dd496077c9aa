use formats::table::{CellValue, FeedTable, TableRow};
use foundation::geo::LatLng;
use foundation::ids::ProjectId;

use crate::aliases::{CanonicalField, is_canonical_label, label_matches};
use crate::project::{FeedIdentity, Project};

/// Upper bound on unmapped columns carried into the detail popup.
pub const MAX_EXTRA_FIELDS: usize = 15;

/// Value of the first alias of `field` whose column is non-blank.
pub fn resolve_field<'a>(row: &TableRow<'a>, field: CanonicalField) -> Option<&'a CellValue> {
    field.aliases().iter().find_map(|alias| {
        row.iter()
            .find(|(label, value)| label_matches(label, alias) && !value.is_blank())
            .map(|(_, value)| value)
    })
}

fn resolve_text(row: &TableRow<'_>, field: CanonicalField) -> String {
    resolve_field(row, field)
        .map(|v| v.as_text().trim().to_string())
        .unwrap_or_default()
}

/// Lenient coordinate parsing: accepts `5,9804` as well as `5.9804`.
///
/// Missing, unparsable or non-finite values read as `0.0`.
pub fn parse_coordinate(value: Option<&CellValue>) -> f64 {
    let parsed = match value {
        Some(CellValue::Number(n)) => Some(*n),
        Some(CellValue::Text(s)) => s.replace(',', ".").trim().parse::<f64>().ok(),
        Some(CellValue::Empty) | Some(CellValue::Bool(_)) | None => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn extra_fields(row: &TableRow<'_>) -> Vec<(String, String)> {
    row.iter()
        .filter(|(label, value)| !is_canonical_label(label) && !value.is_blank())
        .take(MAX_EXTRA_FIELDS)
        .map(|(label, value)| (label.to_string(), value.as_text().into_owned()))
        .collect()
}

/// Normalizes one source row. Returns `None` when the row has no site name.
pub fn normalize_row(feed: &FeedIdentity, row_index: usize, row: &TableRow<'_>) -> Option<Project> {
    let site_name = resolve_text(row, CanonicalField::SiteName);
    if site_name.is_empty() {
        return None;
    }

    Some(Project {
        id: ProjectId::from_row(&feed.key, row_index),
        site_name,
        district: resolve_text(row, CanonicalField::District),
        dun: resolve_text(row, CanonicalField::Dun),
        parliament: resolve_text(row, CanonicalField::Parliament),
        position: LatLng::new(
            parse_coordinate(resolve_field(row, CanonicalField::Latitude)),
            parse_coordinate(resolve_field(row, CanonicalField::Longitude)),
        ),
        status: resolve_text(row, CanonicalField::Status),
        category: feed.category,
        extra_fields: extra_fields(row),
    })
}

/// Normalizes every row of a feed table.
///
/// Row indices count rejected rows too, so an id never shifts when an
/// earlier row loses its name.
pub fn normalize_table(feed: &FeedIdentity, table: &FeedTable) -> Vec<Project> {
    table
        .iter_rows()
        .enumerate()
        .filter_map(|(idx, row)| normalize_row(feed, idx, &row))
        .collect()
}
