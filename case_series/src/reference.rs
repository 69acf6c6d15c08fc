use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::melt::LongTable;

// ******** Regions *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionPopulation {
    pub name: String,
    pub population: u64,
}

const CHILEAN_REGIONS: [(&str, u64); 16] = [
    ("Metropolitana", 7112808),
    ("Valparaíso", 1815902),
    ("Biobío", 1556805),
    ("Maule", 1044950),
    ("Araucanía", 957224),
    ("O'Higgins", 914555),
    ("Los Lagos", 828708),
    ("Coquimbo", 757586),
    ("Antofagasta", 607534),
    ("Ñuble", 480609),
    ("Los Ríos", 384837),
    ("Tarapacá", 330558),
    ("Atacama", 286168),
    ("Arica y Parinacota", 226068),
    ("Magallanes", 166533),
    ("Aysén", 103158),
];

/// The population of the 16 regions of Chile.
pub fn chilean_regions() -> Vec<RegionPopulation> {
    CHILEAN_REGIONS
        .iter()
        .map(|(name, population)| RegionPopulation {
            name: name.to_string(),
            population: *population,
        })
        .collect()
}

/// Cases per 100k inhabitants.
///
/// None if the population is unknown or zero.
pub fn per_100k(value: i64, population: Option<u64>) -> Option<f64> {
    match population {
        Some(p) if p > 0 => Some(value as f64 / p as f64 * 100_000.0),
        _ => None,
    }
}

// ******** Countries *********

/// An entry of the country code table (the ids of the world map shapes).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CountryCode {
    pub code: String,
    pub map_id: u32,
}

/// An entry of the countries table.
#[derive(PartialEq, Debug, Clone)]
pub struct CountryRow {
    pub code: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CountryRecord {
    pub name: String,
    pub code: String,
    pub map_id: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// The reference table of countries, keyed by name.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CountryTable {
    records: Vec<CountryRecord>,
}

/// What happened during a join.
///
/// A join never fails on names it cannot match: the rows are dropped (inner
/// join) or get a missing value (left join), and the names are listed here.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct JoinReport {
    /// Rows before the join.
    pub input_rows: usize,
    /// Rows after the join.
    pub output_rows: usize,
    /// Entities of the data that have no match in the reference.
    pub unmatched_entities: Vec<String>,
    /// Reference entries that no entity of the data matched.
    pub unused_reference: Vec<String>,
}

impl JoinReport {
    pub fn is_clean(&self) -> bool {
        self.unmatched_entities.is_empty()
    }

    fn log(&self, what: &str) {
        for name in self.unmatched_entities.iter() {
            warn!("{}: no reference entry for {:?}", what, name);
        }
        if !self.unused_reference.is_empty() {
            debug!(
                "{}: {} reference entries unused: {:?}",
                what,
                self.unused_reference.len(),
                self.unused_reference
            );
        }
        info!(
            "{}: {} rows -> {} rows, {} unmatched entities",
            what,
            self.input_rows,
            self.output_rows,
            self.unmatched_entities.len()
        );
    }
}

impl CountryTable {
    pub fn new(records: Vec<CountryRecord>) -> CountryTable {
        CountryTable { records }
    }

    /// Joins the code table and the countries table by code.
    ///
    /// Codes present in only one of the tables are dropped and reported.
    pub fn from_parts(codes: &[CountryCode], countries: &[CountryRow]) -> (CountryTable, JoinReport) {
        let by_code: HashMap<&str, &CountryRow> =
            countries.iter().map(|c| (c.code.as_str(), c)).collect();
        let mut records: Vec<CountryRecord> = Vec::new();
        let mut unmatched: Vec<String> = Vec::new();
        let mut used: HashSet<&str> = HashSet::new();
        for cc in codes.iter() {
            match by_code.get(cc.code.as_str()) {
                Some(row) => {
                    used.insert(row.code.as_str());
                    records.push(CountryRecord {
                        name: row.name.clone(),
                        code: cc.code.clone(),
                        map_id: cc.map_id,
                        lat: row.lat,
                        lon: row.lon,
                    });
                }
                None => unmatched.push(cc.code.clone()),
            }
        }
        let unused: Vec<String> = countries
            .iter()
            .filter(|c| !used.contains(c.code.as_str()))
            .map(|c| c.code.clone())
            .collect();
        let report = JoinReport {
            input_rows: codes.len(),
            output_rows: records.len(),
            unmatched_entities: unmatched,
            unused_reference: unused,
        };
        report.log("country codes");
        (CountryTable { records }, report)
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }
}

// ******** Joins *********

/// Adds the population of each region (left join on the region name).
///
/// Regions that are not in the population table get a missing population.
pub fn join_population(
    table: LongTable,
    regions: &[RegionPopulation],
) -> SeriesResult<(LongTable, JoinReport)> {
    let key_idx = table.column_index(REGION_TITLE)?;
    let populations: HashMap<&str, u64> = regions
        .iter()
        .map(|r| (r.name.as_str(), r.population))
        .collect();

    let entities = table.entities(REGION_TITLE)?;
    let unmatched_entities: Vec<String> = entities
        .iter()
        .filter(|e| !populations.contains_key(e.as_str()))
        .cloned()
        .collect();
    let unused_reference: Vec<String> = regions
        .iter()
        .filter(|r| !entities.contains(&r.name))
        .map(|r| r.name.clone())
        .collect();

    let input_rows = table.len();
    let joined = table.with_column(POPULATION, |obs| {
        let name = obs.ids[key_idx].to_string();
        match populations.get(name.as_str()) {
            Some(p) => Cell::Count(*p as i64),
            None => Cell::Missing,
        }
    });
    let report = JoinReport {
        input_rows,
        output_rows: joined.len(),
        unmatched_entities,
        unused_reference,
    };
    report.log("population join");
    Ok((joined, report))
}

/// Adds the country code, map id and centroid of each country (inner join on
/// the country name).
///
/// Countries that are not in the reference table are dropped.
pub fn join_countries(
    table: &LongTable,
    key: &str,
    countries: &CountryTable,
) -> SeriesResult<(LongTable, JoinReport)> {
    let key_idx = table.column_index(key)?;
    let by_name: HashMap<&str, &CountryRecord> = countries
        .records
        .iter()
        .map(|r| (r.name.as_str(), r))
        .collect();

    let entities = table.entities(key)?;
    let unmatched_entities: Vec<String> = entities
        .iter()
        .filter(|e| !by_name.contains_key(e.as_str()))
        .cloned()
        .collect();
    let unused_reference: Vec<String> = countries
        .records
        .iter()
        .filter(|r| !entities.contains(&r.name))
        .map(|r| r.name.clone())
        .collect();

    let mut columns = table.columns.clone();
    columns.extend(
        [COUNTRY_CODE, MAP_ID, CENTROID_LAT, CENTROID_LON]
            .iter()
            .map(|s| s.to_string()),
    );
    let mut rows = Vec::with_capacity(table.len());
    for obs in table.rows.iter() {
        let name = obs.ids[key_idx].to_string();
        if let Some(record) = by_name.get(name.as_str()) {
            let mut joined = obs.clone();
            joined.ids.push(Cell::Text(record.code.clone()));
            joined.ids.push(Cell::Count(record.map_id as i64));
            joined.ids.push(record.lat.map(Cell::Number).unwrap_or(Cell::Missing));
            joined.ids.push(record.lon.map(Cell::Number).unwrap_or(Cell::Missing));
            rows.push(joined);
        }
    }

    let joined = LongTable {
        metric: table.metric.clone(),
        columns,
        rows,
    };
    let report = JoinReport {
        input_rows: table.len(),
        output_rows: joined.len(),
        unmatched_entities,
        unused_reference,
    };
    report.log("country join");
    Ok((joined, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::crosswalk::Crosswalk;
    use crate::melt::melt;

    fn reference() -> CountryTable {
        let codes = vec![
            CountryCode {
                code: "CL".to_string(),
                map_id: 152,
            },
            CountryCode {
                code: "KR".to_string(),
                map_id: 410,
            },
            CountryCode {
                code: "XX".to_string(),
                map_id: 999,
            },
        ];
        let countries = vec![
            CountryRow {
                code: "CL".to_string(),
                name: "Chile".to_string(),
                lat: Some(-35.675147),
                lon: Some(-71.542969),
            },
            CountryRow {
                code: "KR".to_string(),
                name: "South Korea".to_string(),
                lat: Some(35.907757),
                lon: Some(127.766922),
            },
        ];
        let (table, report) = CountryTable::from_parts(&codes, &countries);
        assert_eq!(report.unmatched_entities, vec!["XX".to_string()]);
        table
    }

    fn international() -> LongTable {
        let cw = Crosswalk::builtin();
        let mut wide = Builder::new(&["Country/Region", "3/1/20", "3/2/20"])
            .row(vec!["Chile".into(), Cell::Count(0), Cell::Count(1)])
            .row(vec!["Korea, South".into(), Cell::Count(3), Cell::Count(8)])
            .row(vec!["Diamond Princess".into(), Cell::Count(700), Cell::Count(705)])
            .build()
            .unwrap();
        wide.map_text(COUNTRY_REGION, |s| cw.apply(s).to_string())
            .unwrap();
        wide.rename_column(COUNTRY_REGION, COUNTRY).unwrap();
        melt(&wide, &DateLayout::international(), CONFIRMED).unwrap()
    }

    #[test]
    fn proportion_per_100k() {
        let regions = chilean_regions();
        let valparaiso = regions.iter().find(|r| r.name == "Valparaíso").unwrap();
        assert_eq!(valparaiso.population, 1_815_902);
        let p = per_100k(100, Some(valparaiso.population)).unwrap();
        assert!((p - 5.51).abs() < 0.01);
        assert_eq!(per_100k(100, None), None);
        assert_eq!(per_100k(100, Some(0)), None);
    }

    #[test]
    fn population_left_join() {
        let wide = Builder::new(&["region_title", "01-04-2020"])
            .row(vec!["Valparaíso".into(), Cell::Count(100)])
            .row(vec!["Valparaiso".into(), Cell::Count(3)])
            .build()
            .unwrap();
        let long = melt(&wide, &DateLayout::national(), NATIONAL_METRIC).unwrap();
        let (joined, report) = join_population(long, &chilean_regions()).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.columns, vec!["region_title", "population"]);
        assert_eq!(joined.rows[0].ids[1], Cell::Count(1_815_902));
        assert_eq!(joined.rows[1].ids[1], Cell::Missing);
        assert_eq!(report.unmatched_entities, vec!["Valparaiso".to_string()]);
        assert_eq!(report.unused_reference.len(), 15);
    }

    #[test]
    fn normalized_names_join_the_reference() {
        let (joined, _) = join_countries(&international(), COUNTRY, &reference()).unwrap();
        let korea: Vec<_> = joined
            .rows
            .iter()
            .filter(|o| o.ids[0] == Cell::from("South Korea"))
            .collect();
        assert_eq!(korea.len(), 2);
        let code = joined.id(korea[0], COUNTRY_CODE).unwrap();
        assert_eq!(code, &Cell::from("KR"));
        assert_eq!(joined.id(korea[0], MAP_ID).unwrap(), &Cell::Count(410));
    }

    #[test]
    fn unmatched_countries_are_dropped_and_reported() {
        let long = international();
        let num_dates = long.dates().len();
        let (joined, report) = join_countries(&long, COUNTRY, &reference()).unwrap();
        assert_eq!(report.unmatched_entities, vec!["Diamond Princess".to_string()]);
        assert_eq!(
            joined.len(),
            long.len() - report.unmatched_entities.len() * num_dates
        );
        assert_eq!(report.input_rows, 6);
        assert_eq!(report.output_rows, 4);
        assert!(!report.is_clean());
    }
}
