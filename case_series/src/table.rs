use log::debug;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::*;

/// A date column of a wide table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DateColumn {
    /// Position of the column in the table.
    pub index: usize,
    pub label: String,
    pub date: NaiveDate,
}

/// A table with one row per entity.
///
/// In the sources, all the columns after the identifier columns are dates and
/// contain cumulative counts.
///
/// Invariant: every row has exactly as many cells as there are columns.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct WideTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl WideTable {
    pub fn new(columns: Vec<String>) -> WideTable {
        WideTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> SeriesResult<()> {
        if row.len() != self.columns.len() {
            return Err(SeriesError::RowLength {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> SeriesResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SeriesError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// The date columns, in chronological order.
    ///
    /// Lexical order of the labels cannot be trusted (`10/1/20` < `9/1/20`),
    /// so every label is parsed.
    pub fn date_columns(&self, layout: &DateLayout) -> SeriesResult<Vec<DateColumn>> {
        let mut res: Vec<DateColumn> = Vec::new();
        for (index, label) in self.columns.iter().enumerate() {
            if let Some(date) = layout.parse(label)? {
                res.push(DateColumn {
                    index,
                    label: label.clone(),
                    date,
                });
            }
        }
        // Stable sort: duplicated dates keep their column order.
        res.sort_by_key(|dc| dc.date);
        Ok(res)
    }

    /// The positions of the columns that are not dates.
    pub fn id_columns(&self, layout: &DateLayout) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|idx| !layout.is_date_column(&self.columns[*idx]))
            .collect()
    }

    /// The distinct text values of a column, in order of appearance.
    pub fn entities(&self, column: &str) -> SeriesResult<Vec<String>> {
        let idx = self.column_index(column)?;
        let mut res: Vec<String> = Vec::new();
        for row in self.rows.iter() {
            let name = row[idx].to_string();
            if !res.contains(&name) {
                res.push(name);
            }
        }
        Ok(res)
    }

    /// Removes the given columns. Names that do not exist are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> WideTable {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|idx| !names.contains(&self.columns[*idx].as_str()))
            .collect();
        debug!(
            "drop_columns: {:?} -> {} of {} columns kept",
            names,
            keep.len(),
            self.columns.len()
        );
        self.select_columns(&keep)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> SeriesResult<()> {
        let idx = self.column_index(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Rewrites the text cells of a column. Other cells are left untouched.
    pub fn map_text<F>(&mut self, column: &str, f: F) -> SeriesResult<()>
    where
        F: Fn(&str) -> String,
    {
        let idx = self.column_index(column)?;
        for row in self.rows.iter_mut() {
            if let Cell::Text(s) = &row[idx] {
                row[idx] = Cell::Text(f(s));
            }
        }
        Ok(())
    }

    /// Merges the rows sharing the same key into one row, ordered by key.
    ///
    /// Numeric cells are summed, a missing cell does not contribute and only
    /// stays missing if all the merged cells are missing. Other text cells keep
    /// the value of the first row.
    pub fn aggregate_by(&self, key: &str) -> SeriesResult<WideTable> {
        let key_idx = self.column_index(key)?;
        let mut groups: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
        for row in self.rows.iter() {
            let k = row[key_idx].to_string();
            match groups.get_mut(&k) {
                None => {
                    groups.insert(k, row.clone());
                }
                Some(acc) => {
                    for (idx, cell) in row.iter().enumerate() {
                        if idx != key_idx {
                            acc[idx] = add_cells(&acc[idx], cell);
                        }
                    }
                }
            }
        }
        debug!(
            "aggregate_by: {:?}: {} rows -> {} rows",
            key,
            self.rows.len(),
            groups.len()
        );
        Ok(WideTable {
            columns: self.columns.clone(),
            rows: groups.into_values().collect(),
        })
    }

    pub(crate) fn select_columns(&self, indexes: &[usize]) -> WideTable {
        WideTable {
            columns: indexes.iter().map(|i| self.columns[*i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indexes.iter().map(|i| row[*i].clone()).collect())
                .collect(),
        }
    }

    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> WideTable {
        WideTable { columns, rows }
    }
}

fn add_cells(acc: &Cell, other: &Cell) -> Cell {
    match (acc, other) {
        (Cell::Missing, x) => x.clone(),
        (x, Cell::Missing) => x.clone(),
        (Cell::Count(a), Cell::Count(b)) => Cell::Count(a + b),
        (Cell::Count(a), Cell::Number(b)) => Cell::Number(*a as f64 + b),
        (Cell::Number(a), Cell::Count(b)) => Cell::Number(a + *b as f64),
        (Cell::Number(a), Cell::Number(b)) => Cell::Number(a + b),
        (x, _) => x.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn jhu_sample() -> WideTable {
        Builder::new(&["Province/State", "Country/Region", "Lat", "Long", "3/1/20", "3/2/20"])
            .row(vec![Cell::Missing, "Chile".into(), Cell::Number(-35.6), Cell::Number(-71.5), Cell::Count(1), Cell::Count(3)])
            .row(vec!["Ontario".into(), "Canada".into(), Cell::Number(51.2), Cell::Number(-85.3), Cell::Count(2), Cell::Count(2)])
            .row(vec!["Quebec".into(), "Canada".into(), Cell::Number(52.9), Cell::Number(-73.5), Cell::Missing, Cell::Count(5)])
            .build()
            .unwrap()
    }

    #[test]
    fn date_columns_are_sorted_chronologically() {
        let table = Builder::new(&["country", "10/1/20", "9/30/20", "1/2/21"])
            .build()
            .unwrap();
        let dates = table.date_columns(&DateLayout::international()).unwrap();
        let labels: Vec<&str> = dates.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["9/30/20", "10/1/20", "1/2/21"]);
        assert_eq!(dates[0].index, 2);
    }

    #[test]
    fn malformed_date_column() {
        let table = Builder::new(&["country", "13/45/20"]).build().unwrap();
        let res = table.date_columns(&DateLayout::international());
        assert_eq!(
            res,
            Err(SeriesError::MalformedDate {
                column: "13/45/20".to_string()
            })
        );
    }

    #[test]
    fn wrong_year_width_is_malformed() {
        let table = Builder::new(&["Country/Region", "3/1/20", "3/2/2020"])
            .build()
            .unwrap();
        let res = table.date_columns(&DateLayout::international());
        assert_eq!(
            res,
            Err(SeriesError::MalformedDate {
                column: "3/2/2020".to_string()
            })
        );
        assert_eq!(table.id_columns(&DateLayout::international()), vec![0]);

        let table = Builder::new(&["region_title", "01-04-2020", "2020-04-02"])
            .build()
            .unwrap();
        let res = table.date_columns(&DateLayout::national());
        assert_eq!(
            res,
            Err(SeriesError::MalformedDate {
                column: "2020-04-02".to_string()
            })
        );
    }

    #[test]
    fn row_length_is_checked() {
        let mut table = WideTable::new(vec!["a".to_string(), "b".to_string()]);
        let res = table.push_row(vec![Cell::Count(1)]);
        assert_eq!(
            res,
            Err(SeriesError::RowLength {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn drop_then_aggregate() {
        let table = jhu_sample()
            .drop_columns(&[PROVINCE_STATE, LATITUDE, LONGITUDE])
            .aggregate_by(COUNTRY_REGION)
            .unwrap();
        assert_eq!(table.columns(), &["Country/Region", "3/1/20", "3/2/20"]);
        assert_eq!(
            table.rows(),
            &[
                vec!["Canada".into(), Cell::Count(2), Cell::Count(7)],
                vec!["Chile".into(), Cell::Count(1), Cell::Count(3)],
            ]
        );
    }

    #[test]
    fn entities_in_order_of_appearance() {
        let table = jhu_sample();
        assert_eq!(
            table.entities(COUNTRY_REGION).unwrap(),
            vec!["Chile".to_string(), "Canada".to_string()]
        );
    }
}
