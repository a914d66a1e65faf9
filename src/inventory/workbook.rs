//! In-memory workbook model and xlsx parsing.
//!
//! Cells hold the values cached in the file; formulas are never evaluated.

use super::source::FetchError;
use calamine::{Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value
    Empty,
    /// Text value
    Text(String),
    /// Numeric value (integers included)
    Number(f64),
    /// Boolean value
    Bool(bool),
}

impl Cell {
    /// Returns `true` for missing cells and blank text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(text) => Self::Text(text.clone()),
            Data::Float(value) => Self::Number(*value),
            #[allow(clippy::cast_precision_loss)]
            Data::Int(value) => Self::Number(*value as f64),
            Data::Bool(value) => Self::Bool(*value),
            // Dates, durations and error values keep their display form
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text.trim()),
            // f64 Display already drops the fractional part of integral values
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Quantity column of a stock row
#[derive(Debug, Clone, PartialEq)]
pub enum Quantity {
    /// Numeric amount
    Number(f64),
    /// Anything else the sheet author typed in
    Text(String),
}

impl Quantity {
    fn from_cell(cell: &Cell) -> Option<Self> {
        match cell {
            Cell::Empty => None,
            Cell::Number(value) => Some(Self::Number(*value)),
            Cell::Text(text) if text.trim().is_empty() => None,
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One item of a stock sheet: label from the first column, quantity from the second
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    /// Item name
    pub label: String,
    /// Amount on hand, `None` when the cell is blank or missing
    pub quantity: Option<Quantity>,
}

impl StockRow {
    /// Creates a row from a label and an optional numeric quantity.
    #[must_use]
    pub fn new(label: impl Into<String>, quantity: Option<f64>) -> Self {
        Self {
            label: label.into(),
            quantity: quantity.map(Quantity::Number),
        }
    }

    /// Builds a row from raw cells. Returns `None` when the first cell is empty.
    #[must_use]
    pub fn from_cells(cells: &[Cell]) -> Option<Self> {
        let first = cells.first().filter(|cell| !cell.is_empty())?;
        Some(Self {
            label: first.to_string(),
            quantity: cells.get(1).and_then(Quantity::from_cell),
        })
    }
}

/// A single worksheet, addressed from A1 regardless of where data starts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Creates a sheet from rows of cells, the first row being the header.
    #[must_use]
    pub const fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Creates a sheet from a header and `(label, quantity)` pairs.
    #[must_use]
    pub fn with_stock(header: &[&str], items: &[(&str, Option<f64>)]) -> Self {
        let mut rows = vec![header
            .iter()
            .map(|title| Cell::Text((*title).to_string()))
            .collect::<Vec<_>>()];
        rows.extend(items.iter().map(|(label, quantity)| {
            vec![
                Cell::Text((*label).to_string()),
                quantity.map_or(Cell::Empty, Cell::Number),
            ]
        }));
        Self { rows }
    }

    fn from_range(range: &Range<Data>) -> Self {
        // calamine trims leading blank rows and columns; restore them so the
        // header is always the first sheet row.
        let Some((first_row, first_col)) = range.start() else {
            return Self::default();
        };
        let mut rows: Vec<Vec<Cell>> = (0..first_row).map(|_| Vec::new()).collect();
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; first_col as usize];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }
        Self { rows }
    }

    /// All rows including the header.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Data rows below the header whose first cell is filled in, in sheet order.
    #[must_use]
    pub fn stock_rows(&self) -> Vec<StockRow> {
        self.rows
            .iter()
            .skip(1)
            .filter_map(|cells| StockRow::from_cells(cells))
            .collect()
    }
}

/// Parsed spreadsheet: sheets keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: HashMap<String, Sheet>,
    order: Vec<String>,
}

impl Workbook {
    /// Parses an xlsx file held in memory.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Parse` if the bytes are not a readable xlsx
    /// workbook or one of its sheets cannot be read.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self, FetchError> {
        let mut reader: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let mut workbook = Self::default();
        for name in reader.sheet_names().to_vec() {
            let range = reader
                .worksheet_range(&name)
                .map_err(|e| FetchError::Parse(format!("sheet '{name}': {e}")))?;
            workbook.insert_sheet(name, Sheet::from_range(&range));
        }
        Ok(workbook)
    }

    /// Adds or replaces a sheet.
    pub fn insert_sheet(&mut self, name: impl Into<String>, sheet: Sheet) {
        let name = name.into();
        if !self.sheets.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sheets.insert(name, sheet);
    }

    /// Builder-style variant of [`Workbook::insert_sheet`].
    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.insert_sheet(name, sheet);
        self
    }

    /// Looks up a sheet by its exact name.
    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    /// Sheet names in file order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of sheets.
    #[must_use]
    pub fn sheet_count(&self) -> usize {
        self.order.len()
    }
}
