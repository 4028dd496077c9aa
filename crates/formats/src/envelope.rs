//! Spreadsheet query envelope.
//!
//! Feeds answer with a JavaScript callback wrapping a JSON table:
//!
//! ```text
//! /*O_o*/
//! google.visualization.Query.setResponse({"status":"ok","table":{...}});
//! ```
//!
//! Only the JSON between the `setResponse(` marker and the final `);` is
//! read; anything else around it is ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::table::{CellValue, FeedTable};

const START_MARKER: &str = "setResponse(";
const END_MARKER: &str = ");";

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    MissingStartMarker,
    MissingEndMarker,
    Json(String),
    /// The query endpoint answered with `status: "error"`.
    Query(String),
    MissingTable,
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeError::MissingStartMarker => write!(f, "envelope start marker not found"),
            EnvelopeError::MissingEndMarker => write!(f, "envelope end marker not found"),
            EnvelopeError::Json(msg) => write!(f, "envelope JSON parse error: {msg}"),
            EnvelopeError::Query(msg) => write!(f, "query returned an error: {msg}"),
            EnvelopeError::MissingTable => write!(f, "envelope has no table"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<QueryMessage>,
    #[serde(default)]
    table: Option<QueryTable>,
}

#[derive(Debug, Deserialize)]
struct QueryMessage {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    detailed_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryTable {
    #[serde(default)]
    cols: Vec<Option<QueryColumn>>,
    #[serde(default)]
    rows: Vec<QueryRow>,
}

#[derive(Debug, Deserialize)]
struct QueryColumn {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    c: Vec<Option<QueryCell>>,
}

#[derive(Debug, Deserialize)]
struct QueryCell {
    #[serde(default)]
    v: Value,
    #[serde(default)]
    f: Option<String>,
}

/// Returns the JSON payload enclosed by the envelope markers.
pub fn envelope_payload(text: &str) -> Result<&str, EnvelopeError> {
    let start = text
        .find(START_MARKER)
        .ok_or(EnvelopeError::MissingStartMarker)?
        + START_MARKER.len();
    let end = text
        .rfind(END_MARKER)
        .filter(|end| *end >= start)
        .ok_or(EnvelopeError::MissingEndMarker)?;
    Ok(&text[start..end])
}

/// Parses a full envelope into column labels and rows.
pub fn parse_envelope(text: &str) -> Result<FeedTable, EnvelopeError> {
    let payload = envelope_payload(text)?;
    let response: QueryResponse =
        serde_json::from_str(payload).map_err(|e| EnvelopeError::Json(e.to_string()))?;

    if response.status.as_deref() == Some("error") {
        let msg = response
            .errors
            .iter()
            .filter_map(|e| e.detailed_message.as_deref().or(e.reason.as_deref()))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EnvelopeError::Query(msg));
    }

    let table = response.table.ok_or(EnvelopeError::MissingTable)?;

    let columns = table
        .cols
        .iter()
        .enumerate()
        .map(|(i, col)| {
            col.as_ref()
                .and_then(|c| c.label.as_deref())
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("col{i}"))
        })
        .collect();

    let rows = table
        .rows
        .into_iter()
        .map(|row| row.c.into_iter().map(cell_value).collect())
        .collect();

    Ok(FeedTable::new(columns, rows))
}

fn cell_value(cell: Option<QueryCell>) -> CellValue {
    let Some(cell) = cell else {
        return CellValue::Empty;
    };
    match cell.v {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Bool(b),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        // Date cells arrive as `Date(2024,0,5)`; the formatted value is what
        // the sheet shows.
        Value::String(s) if s.starts_with("Date(") => CellValue::Text(cell.f.unwrap_or(s)),
        Value::String(s) => CellValue::Text(s),
        other => CellValue::Text(other.to_string()),
    }
}
