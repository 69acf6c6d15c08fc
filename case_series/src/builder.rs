pub use crate::config::*;
use crate::table::WideTable;

/// A builder for wide tables.
///
/// The readers of spreadsheets and CSV files push their rows through it; it
/// is also the simplest way to write a table by hand.
///
/// ```
/// use case_series::builder::Builder;
/// use case_series::{daily_deltas, Cell, DateLayout, NegativeDeltaPolicy};
///
/// let cumulative = Builder::new(&["region_title", "01-04-2020", "02-04-2020"])
///     .row(vec!["Maule".into(), Cell::Count(10), Cell::Count(14)])
///     .build()?;
///
/// let daily = daily_deltas(&cumulative, &DateLayout::national(), NegativeDeltaPolicy::PassThrough)?;
/// assert_eq!(daily.rows()[0], vec!["Maule".into(), Cell::Count(10), Cell::Count(4)]);
///
/// # Ok::<(), case_series::SeriesError>(())
/// ```
pub struct Builder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<Cell>>,
}

impl Builder {
    pub fn new(columns: &[&str]) -> Builder {
        Builder::with_columns(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn with_columns(columns: Vec<String>) -> Builder {
        Builder {
            _columns: columns,
            _rows: Vec::new(),
        }
    }

    /// Adds a row. The length of the row is checked when building the table.
    pub fn row(mut self, cells: Vec<Cell>) -> Builder {
        self._rows.push(cells);
        self
    }

    /// Adds a row to a builder held by reference (the readers use this form).
    pub fn add_row(&mut self, cells: Vec<Cell>) {
        self._rows.push(cells);
    }

    pub fn build(self) -> SeriesResult<WideTable> {
        let mut table = WideTable::new(self._columns);
        for row in self._rows {
            table.push_row(row)?;
        }
        Ok(table)
    }
}
