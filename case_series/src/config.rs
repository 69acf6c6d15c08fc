// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use chrono::NaiveDate;
use regex::Regex;

/// The content of a single cell of a table.
///
/// Readers produce cells from spreadsheet or CSV values; the pipeline only
/// interprets `Count` cells as case counts.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    /// A label: a region or country name, for instance.
    Text(String),
    /// An integral number. All the case counts are stored this way.
    Count(i64),
    /// A fractional number (coordinates and the like).
    Number(f64),
    /// An empty cell.
    Missing,
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<i64> {
        match self {
            Cell::Count(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Cell {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(c: i64) -> Cell {
        Cell::Count(c)
    }
}

impl From<Option<i64>> for Cell {
    fn from(c: Option<i64>) -> Cell {
        c.map(Cell::Count).unwrap_or(Cell::Missing)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Count(c) => write!(f, "{}", c),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Missing => Ok(()),
        }
    }
}

/// Errors that prevent the pipeline from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SeriesError {
    /// The label looks like a date column but cannot be read as a date.
    MalformedDate { column: String },
    /// A column required by the operation does not exist.
    MissingColumn { name: String },
    /// A row does not have as many cells as the table has columns.
    RowLength { expected: usize, found: usize },
    /// The table has no column matching the date pattern.
    NoDateColumns,
    /// The name substitution table is not usable.
    InvalidCrosswalk { reason: String },
}

impl Error for SeriesError {}

impl Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::MalformedDate { column } => {
                write!(f, "column {:?} cannot be read as a date", column)
            }
            SeriesError::MissingColumn { name } => write!(f, "missing column {:?}", name),
            SeriesError::RowLength { expected, found } => {
                write!(f, "row has {} cells, expected {}", found, expected)
            }
            SeriesError::NoDateColumns => write!(f, "no date column found"),
            SeriesError::InvalidCrosswalk { reason } => {
                write!(f, "invalid name substitution table: {}", reason)
            }
        }
    }
}

pub type SeriesResult<T> = Result<T, SeriesError>;

// ********* Configuration **********

/// How the date columns of a wide table are labelled.
///
/// The national spreadsheet and the international CSV files do not use the
/// same convention, and the international one (`3/1/20`) does not sort
/// lexically, so each label is parsed with `format` before ordering.
///
/// The pattern only looks at the shape of a label (digits and separators).
/// A label of that shape in the wrong format is a `MalformedDate`, not an
/// identifier column.
#[derive(Debug, Clone)]
pub struct DateLayout {
    pattern: Regex,
    format: String,
}

impl DateLayout {
    /// Labels like `25-03-2020`.
    pub fn national() -> DateLayout {
        DateLayout::from_static(r"^\d+-\d+-\d+$", "%d-%m-%Y")
    }

    /// Labels like `3/25/20`.
    pub fn international() -> DateLayout {
        DateLayout::from_static(r"^\d+/\d+/\d+$", "%m/%d/%y")
    }

    /// Labels like `2020-03-25`.
    pub fn iso() -> DateLayout {
        DateLayout::from_static(r"^\d+-\d+-\d+$", "%Y-%m-%d")
    }

    fn from_static(pattern: &'static str, format: &'static str) -> DateLayout {
        DateLayout {
            // The built-in patterns are known to compile.
            pattern: Regex::new(pattern).unwrap(),
            format: format.to_string(),
        }
    }

    pub fn is_date_column(&self, label: &str) -> bool {
        self.pattern.is_match(label.trim())
    }

    /// Returns None when the label is not a date column, and an error when it
    /// looks like one but does not parse.
    pub fn parse(&self, label: &str) -> SeriesResult<Option<NaiveDate>> {
        if !self.is_date_column(label) {
            return Ok(None);
        }
        NaiveDate::parse_from_str(label.trim(), &self.format)
            .map(Some)
            .map_err(|_| SeriesError::MalformedDate {
                column: label.to_string(),
            })
    }

    /// Renders a date the way this layout labels its columns.
    pub fn label(&self, date: NaiveDate) -> String {
        date.format(&self.format).to_string()
    }
}

/// What to do when a cumulative series decreases from one day to the next.
///
/// Upstream sources occasionally correct their totals downwards, which shows
/// up as a negative daily count.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum NegativeDeltaPolicy {
    /// Keep the negative value, the correction is shown as-is.
    #[default]
    PassThrough,
    /// Replace negative values by zero.
    Clamp,
}

// ********* Column names **********

// Columns of the national spreadsheet.
pub const REGION_TITLE: &str = "region_title";
pub const REGION: &str = "region";
pub const REGION_ID: &str = "id";

// Columns of the international time series.
pub const PROVINCE_STATE: &str = "Province/State";
pub const COUNTRY_REGION: &str = "Country/Region";
pub const LATITUDE: &str = "Lat";
pub const LONGITUDE: &str = "Long";

// Columns added by the pipeline.
pub const POPULATION: &str = "population";
pub const COUNTRY: &str = "country";
pub const COUNTRY_CODE: &str = "code";
pub const MAP_ID: &str = "map_id";
pub const CENTROID_LAT: &str = "lat";
pub const CENTROID_LON: &str = "lon";

// Metric names of the long tables.
pub const NATIONAL_METRIC: &str = "cases";
pub const CONFIRMED: &str = "confirmed";
pub const DEATHS: &str = "deaths";
pub const RECOVERED: &str = "recovered";
