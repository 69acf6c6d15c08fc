// Primitives for reading CSV files.

use serde::Deserialize;

use crate::dash::io_common::Locator;
use crate::dash::*;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// The content is decoded as Latin-1 instead of UTF-8.
    pub latin1: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            latin1: false,
        }
    }
}

/// The countries table is `;`-delimited and Latin-1 encoded.
pub fn countries_options() -> CsvOptions {
    CsvOptions {
        delimiter: b';',
        latin1: true,
    }
}

fn decode(bytes: &[u8], options: &CsvOptions) -> Vec<u8> {
    if options.latin1 {
        // Every Latin-1 byte is the code point of the same value.
        let s: String = bytes.iter().map(|b| *b as char).collect();
        s.into_bytes()
    } else {
        bytes.to_vec()
    }
}

fn reader(bytes: &[u8], options: &CsvOptions) -> csv::Reader<std::io::Cursor<Vec<u8>>> {
    csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(std::io::Cursor::new(decode(bytes, options)))
}

fn parse_cell(s: &str) -> Cell {
    let t = s.trim();
    if t.is_empty() {
        Cell::Missing
    } else if let Ok(i) = t.parse::<i64>() {
        Cell::Count(i)
    } else if let Ok(f) = t.parse::<f64>() {
        Cell::Number(f)
    } else {
        Cell::Text(t.to_string())
    }
}

/// Reads a CSV file with a header row into a table.
pub fn read_table(bytes: &[u8], options: &CsvOptions, locator: &Locator) -> DashResult<WideTable> {
    let mut rdr = reader(bytes, options);
    let header: Vec<String> = rdr
        .headers()
        .context(CsvParseSnafu {
            locator: locator.to_string(),
        })?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    debug!("read_table: {}: header of {} columns", locator.simple_name(), header.len());

    let mut table = WideTable::new(header);
    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r.context(CsvParseSnafu {
            locator: locator.to_string(),
        })?;
        let cells: Vec<Cell> = line.iter().map(parse_cell).collect();
        table.push_row(cells).context(SeriesSnafu {
            what: format!("{} (line {})", locator, idx + 2),
        })?;
    }
    Ok(table)
}

#[derive(Debug, Deserialize)]
struct CountryLine {
    code: String,
    lat: Option<f64>,
    lon: Option<f64>,
    name: String,
}

/// Reads the countries table (code, latitude, longitude, name).
pub fn read_countries(bytes: &[u8], locator: &Locator) -> DashResult<Vec<CountryRow>> {
    let mut rdr = reader(bytes, &countries_options());
    let mut res: Vec<CountryRow> = Vec::new();
    for line_r in rdr.deserialize() {
        let line: CountryLine = line_r.context(CsvParseSnafu {
            locator: locator.to_string(),
        })?;
        res.push(CountryRow {
            code: line.code.trim().to_string(),
            name: line.name.trim().to_string(),
            lat: line.lat,
            lon: line.lon,
        });
    }
    debug!("read_countries: {} countries from {}", res.len(), locator.simple_name());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jhu_series() {
        let content = b"Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
,Afghanistan,33.93911,67.709953,0,0
Australian Capital Territory,Australia,-35.4735,149.0124,0,
,\"Korea, South\",35.907757,127.766922,1,1
";
        let locator = Locator::parse("time_series_covid19_confirmed_global.csv");
        let table = read_table(content, &CsvOptions::default(), &locator).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns()[1], "Country/Region");
        assert_eq!(table.rows()[0][0], Cell::Missing);
        assert_eq!(table.rows()[1][5], Cell::Missing);
        assert_eq!(table.rows()[2][1], Cell::from("Korea, South"));
        assert_eq!(table.rows()[2][2], Cell::Number(35.907757));
        assert_eq!(table.rows()[2][4], Cell::Count(1));
    }

    #[test]
    fn ragged_lines() {
        let content = b"Country/Region,1/22/20\nChile,1,2\n";
        let locator = Locator::parse("ragged.csv");
        let res = read_table(content, &CsvOptions::default(), &locator);
        match res {
            Err(e) => assert!(e.is_data_unavailable()),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn latin1_countries() {
        // "Réunion" and "Åland" in Latin-1.
        let mut content: Vec<u8> = b"code;lat;lon;name\nRE;-21.115141;55.536384;R".to_vec();
        content.push(0xe9);
        content.extend_from_slice(b"union\nAX;;;");
        content.push(0xc5);
        content.extend_from_slice(b"land\n");
        let locator = Locator::parse("countries.csv");
        let countries = read_countries(&content, &locator).unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name, "Réunion");
        assert_eq!(countries[0].lat, Some(-21.115141));
        assert_eq!(countries[1].name, "Åland");
        assert_eq!(countries[1].lon, None);
    }
}
