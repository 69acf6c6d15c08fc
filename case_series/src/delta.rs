use log::{debug, warn};

use crate::config::*;
use crate::table::WideTable;

/// Computes the daily counts from a table of cumulative counts.
///
/// The date columns are ordered chronologically and placed after the other
/// columns, which are passed through unchanged. For each row, the value of a
/// date is the cumulative value minus the one of the previous date, the value
/// before the first date being zero.
///
/// A missing cumulative value gives a missing daily value. The baseline stays
/// at the last observed value, so the next daily value covers the gap.
pub fn daily_deltas(
    table: &WideTable,
    layout: &DateLayout,
    policy: NegativeDeltaPolicy,
) -> SeriesResult<WideTable> {
    let dates = table.date_columns(layout)?;
    let id_columns = table.id_columns(layout);
    debug!(
        "daily_deltas: {} rows, {} id columns, {} date columns",
        table.len(),
        id_columns.len(),
        dates.len()
    );

    let mut columns: Vec<String> = id_columns
        .iter()
        .map(|idx| table.columns()[*idx].clone())
        .collect();
    columns.extend(dates.iter().map(|dc| dc.label.clone()));

    let mut num_negative = 0;
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(table.len());
    for row in table.rows() {
        let mut res: Vec<Cell> = id_columns.iter().map(|idx| row[*idx].clone()).collect();
        let mut previous: i64 = 0;
        for dc in dates.iter() {
            let current = match row[dc.index] {
                Cell::Count(c) => Some(c),
                // Fractional counts do not happen in the sources.
                Cell::Number(n) => Some(n.round() as i64),
                _ => None,
            };
            let cell = match current {
                Some(current) => {
                    let delta = current - previous;
                    previous = current;
                    if delta < 0 {
                        num_negative += 1;
                        match policy {
                            NegativeDeltaPolicy::PassThrough => Cell::Count(delta),
                            NegativeDeltaPolicy::Clamp => Cell::Count(0),
                        }
                    } else {
                        Cell::Count(delta)
                    }
                }
                None => Cell::Missing,
            };
            res.push(cell);
        }
        rows.push(res);
    }

    if num_negative > 0 {
        warn!(
            "daily_deltas: {} negative daily values found (policy: {:?})",
            num_negative, policy
        );
    }

    Ok(WideTable::from_parts(columns, rows))
}

/// The inverse of [daily_deltas]: a running sum over the date columns.
///
/// Missing cells stay missing and do not contribute to the sum.
pub fn cumulate(table: &WideTable, layout: &DateLayout) -> SeriesResult<WideTable> {
    let dates = table.date_columns(layout)?;
    let id_columns = table.id_columns(layout);

    let mut columns: Vec<String> = id_columns
        .iter()
        .map(|idx| table.columns()[*idx].clone())
        .collect();
    columns.extend(dates.iter().map(|dc| dc.label.clone()));

    let rows: Vec<Vec<Cell>> = table
        .rows()
        .iter()
        .map(|row| {
            let mut res: Vec<Cell> = id_columns.iter().map(|idx| row[*idx].clone()).collect();
            let mut total: i64 = 0;
            for dc in dates.iter() {
                match row[dc.index].as_count() {
                    Some(c) => {
                        total += c;
                        res.push(Cell::Count(total));
                    }
                    None => res.push(Cell::Missing),
                }
            }
            res
        })
        .collect();

    Ok(WideTable::from_parts(columns, rows))
}
