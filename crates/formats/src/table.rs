use std::borrow::Cow;

/// One scalar spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Empty cells and whitespace-only text count as no value.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    /// Display form used for labels and detail rows.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.trim()),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
            CellValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Column labels plus rows of cells aligned to them.
///
/// Rows may be shorter than the column list; missing trailing cells read as
/// [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl FeedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<TableRow<'_>> {
        self.rows.get(index).map(|cells| TableRow {
            columns: &self.columns,
            cells,
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = TableRow<'_>> + '_ {
        self.rows.iter().map(|cells| TableRow {
            columns: &self.columns,
            cells,
        })
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Borrowed view of one row with its column labels.
#[derive(Debug, Copy, Clone)]
pub struct TableRow<'a> {
    pub columns: &'a [String],
    pub cells: &'a [CellValue],
}

impl<'a> TableRow<'a> {
    pub fn cell(&self, column: usize) -> &'a CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// `(label, value)` pairs in source column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> + 'a {
        let cells = self.cells;
        self.columns
            .iter()
            .enumerate()
            .map(move |(i, label)| (label.as_str(), cells.get(i).unwrap_or(&EMPTY_CELL)))
    }
}
