// Reads the national spreadsheet.

use std::io::Cursor;

use calamine::{DataType, Range, Reader, Xlsx};

use crate::dash::io_common::Locator;
use crate::dash::*;

pub fn read_sheet(bytes: &[u8], sheet: &str, locator: &Locator) -> DashResult<WideTable> {
    debug!("read_sheet: {} worksheet: {:?}", locator, sheet);
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec())).context(
        OpeningExcelSnafu {
            locator: locator.to_string(),
        },
    )?;
    let available: Vec<String> = workbook.sheet_names().to_vec();
    let wrange = workbook
        .worksheet_range(sheet)
        .context(MissingSheetSnafu {
            sheet,
            locator: locator.to_string(),
            available,
        })?
        .context(OpeningExcelSnafu {
            locator: locator.to_string(),
        })?;
    read_range(&wrange, sheet, locator)
}

fn read_range(wrange: &Range<DataType>, sheet: &str, locator: &Locator) -> DashResult<WideTable> {
    let mut iter = wrange.rows();
    let header = iter.next().context(EmptySheetSnafu {
        sheet,
        locator: locator.to_string(),
    })?;
    // Columns without a name are ignored.
    let columns: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, header_label(c)))
        .filter(|(_, label)| !label.is_empty())
        .collect();
    debug!("read_range: header: {:?}", columns);
    if columns.is_empty() {
        return EmptySheetSnafu {
            sheet,
            locator: locator.to_string(),
        }
        .fail();
    }

    let mut table = WideTable::new(columns.iter().map(|(_, label)| label.clone()).collect());
    for row in iter {
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        let cells: Vec<Cell> = columns
            .iter()
            .map(|(idx, _)| row.get(*idx).map(body_cell).unwrap_or(Cell::Missing))
            .collect();
        table.push_row(cells).context(SeriesSnafu {
            what: locator.to_string(),
        })?;
    }
    if table.is_empty() {
        return EmptySheetSnafu {
            sheet,
            locator: locator.to_string(),
        }
        .fail();
    }
    Ok(table)
}

/// The date of a spreadsheet date cell (days since 1899-12-30).
fn excel_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn header_label(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        // Same layout as the text labels of the sheet.
        DataType::DateTime(serial) => match excel_date(*serial) {
            Some(d) => DateLayout::national().label(d),
            None => serial.to_string(),
        },
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Empty => "".to_string(),
        x => format!("{:?}", x),
    }
}

fn body_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) if s.trim().is_empty() => Cell::Missing,
        DataType::String(s) => Cell::Text(s.trim().to_string()),
        DataType::Int(i) => Cell::Count(*i),
        DataType::Float(f) if f.fract() == 0.0 => Cell::Count(*f as i64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::DateTime(serial) => match excel_date(*serial) {
            Some(d) => Cell::Text(DateLayout::iso().label(d)),
            None => Cell::Missing,
        },
        DataType::Bool(b) => Cell::Text(b.to_string()),
        _ => Cell::Missing,
    }
}
