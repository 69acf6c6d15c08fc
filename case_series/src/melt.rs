use log::debug;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::*;
use crate::table::WideTable;

/// One observation of a long table: the identifier cells of the entity, a
/// date and the value of the metric on that date.
#[derive(PartialEq, Debug, Clone)]
pub struct Observation {
    pub ids: Vec<Cell>,
    pub date: NaiveDate,
    pub value: Option<i64>,
}

/// A table with one row per (entity, date).
///
/// Invariant: every observation has as many identifier cells as there are
/// columns.
#[derive(PartialEq, Debug, Clone)]
pub struct LongTable {
    /// The name of the value column ("cases", "confirmed", ...)
    pub metric: String,
    /// The identifier columns, carried over from the wide table.
    pub columns: Vec<String>,
    pub rows: Vec<Observation>,
}

/// Reshapes a wide table into a long table.
///
/// All the columns that are not dates are identifier columns. The
/// observations are emitted date by date (chronologically), and in the order of
/// the rows of the wide table for each date.
///
/// Invariant: the number of observations is the number of rows times the
/// number of date columns.
pub fn melt(table: &WideTable, layout: &DateLayout, metric: &str) -> SeriesResult<LongTable> {
    let dates = table.date_columns(layout)?;
    let id_columns = table.id_columns(layout);
    let columns: Vec<String> = id_columns
        .iter()
        .map(|idx| table.columns()[*idx].clone())
        .collect();

    let mut rows: Vec<Observation> = Vec::with_capacity(table.len() * dates.len());
    for dc in dates.iter() {
        for row in table.rows() {
            let value = match row[dc.index] {
                Cell::Count(c) => Some(c),
                Cell::Number(n) => Some(n.round() as i64),
                _ => None,
            };
            rows.push(Observation {
                ids: id_columns.iter().map(|idx| row[*idx].clone()).collect(),
                date: dc.date,
                value,
            });
        }
    }
    debug!(
        "melt: {:?}: {} entities x {} dates -> {} observations",
        metric,
        table.len(),
        dates.len(),
        rows.len()
    );
    Ok(LongTable {
        metric: metric.to_string(),
        columns,
        rows,
    })
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> SeriesResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SeriesError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// The cell of the given identifier column for an observation.
    pub fn id<'a>(&self, obs: &'a Observation, column: &str) -> SeriesResult<&'a Cell> {
        let idx = self.column_index(column)?;
        Ok(&obs.ids[idx])
    }

    /// The distinct values of an identifier column, in order of appearance.
    pub fn entities(&self, column: &str) -> SeriesResult<Vec<String>> {
        let idx = self.column_index(column)?;
        let mut res: Vec<String> = Vec::new();
        for obs in self.rows.iter() {
            let name = obs.ids[idx].to_string();
            if !res.contains(&name) {
                res.push(name);
            }
        }
        Ok(res)
    }

    /// The distinct dates, in chronological order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut res: Vec<NaiveDate> = self.rows.iter().map(|obs| obs.date).collect();
        res.sort();
        res.dedup();
        res
    }

    /// Keeps the observations of the given entities.
    pub fn filter_entities(&self, column: &str, names: &[String]) -> SeriesResult<LongTable> {
        let idx = self.column_index(column)?;
        Ok(self.filter(|obs| names.contains(&obs.ids[idx].to_string())))
    }

    /// Keeps the observations of a single date.
    pub fn on_date(&self, date: NaiveDate) -> LongTable {
        self.filter(|obs| obs.date == date)
    }

    pub fn filter<F>(&self, pred: F) -> LongTable
    where
        F: Fn(&Observation) -> bool,
    {
        LongTable {
            metric: self.metric.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|obs| pred(obs)).cloned().collect(),
        }
    }

    /// The sum of the values of all the observations for each date.
    ///
    /// Missing values do not contribute. A date with only missing values has
    /// a total of zero.
    pub fn totals_by_date(&self) -> Vec<(NaiveDate, i64)> {
        let mut totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for obs in self.rows.iter() {
            *totals.entry(obs.date).or_insert(0) += obs.value.unwrap_or(0);
        }
        totals.into_iter().collect()
    }

    /// Adds an identifier column computed from each observation.
    pub(crate) fn with_column<F>(mut self, name: &str, f: F) -> LongTable
    where
        F: Fn(&Observation) -> Cell,
    {
        for obs in self.rows.iter_mut() {
            let cell = f(obs);
            obs.ids.push(cell);
        }
        self.columns.push(name.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn regions() -> WideTable {
        Builder::new(&["region_title", "region", "id", "02-04-2020", "01-04-2020", "03-04-2020"])
            .row(vec!["Maule".into(), "VII".into(), Cell::Count(7), Cell::Count(4), Cell::Count(2), Cell::Count(9)])
            .row(vec!["Aysén".into(), "XI".into(), Cell::Count(11), Cell::Missing, Cell::Count(1), Cell::Count(1)])
            .build()
            .unwrap()
    }

    #[test]
    fn row_count_is_entities_times_dates() {
        let long = melt(&regions(), &DateLayout::national(), NATIONAL_METRIC).unwrap();
        assert_eq!(long.len(), 2 * 3);
        assert_eq!(long.columns, vec!["region_title", "region", "id"]);
        assert_eq!(long.metric, "cases");
    }

    #[test]
    fn observations_are_emitted_by_date() {
        let long = melt(&regions(), &DateLayout::national(), NATIONAL_METRIC).unwrap();
        let first = &long.rows[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 4, 1).unwrap());
        assert_eq!(first.ids[0], Cell::from("Maule"));
        assert_eq!(first.value, Some(2));
        let second = &long.rows[1];
        assert_eq!(second.ids[0], Cell::from("Aysén"));
        // Missing values are kept as observations.
        assert_eq!(long.rows[3].value, None);
        assert_eq!(long.rows.iter().filter(|o| o.value.is_some()).count(), 5);
    }

    #[test]
    fn malformed_date_label_is_not_an_identifier() {
        let table = Builder::new(&["Country/Region", "3/1/20", "3/2/2020"])
            .row(vec!["Chile".into(), Cell::Count(1), Cell::Count(3)])
            .build()
            .unwrap();
        let res = melt(&table, &DateLayout::international(), CONFIRMED);
        assert!(matches!(res, Err(SeriesError::MalformedDate { column }) if column == "3/2/2020"));
    }

    #[test]
    fn totals_and_filters() {
        let long = melt(&regions(), &DateLayout::national(), NATIONAL_METRIC).unwrap();
        let totals = long.totals_by_date();
        let values: Vec<i64> = totals.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![3, 4, 10]);

        let maule = long
            .filter_entities(REGION_TITLE, &["Maule".to_string()])
            .unwrap();
        assert_eq!(maule.len(), 3);
        assert_eq!(maule.entities(REGION_TITLE).unwrap(), vec!["Maule".to_string()]);

        let day = long.on_date(NaiveDate::from_ymd_opt(2020, 4, 3).unwrap());
        assert_eq!(day.len(), 2);
        assert_eq!(long.dates().len(), 3);
    }
}
