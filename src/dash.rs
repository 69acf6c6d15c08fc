use log::{debug, info, warn};

use case_series::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use chrono::{Days, Local, NaiveDate};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Mode, Scope};
use crate::dash::cache::FetchCache;
use crate::dash::charts::*;
use crate::dash::config_reader::*;
use crate::dash::io_common::{Locator, SourceReader};

mod cache;
mod charts;
mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

pub use crate::dash::charts::ChartScale;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error fetching {url}"))]
    Fetch { source: reqwest::Error, url: String },
    #[snafu(display("Fetching {url} returned the status {status}"))]
    FetchStatus { url: String, status: u16 },
    #[snafu(display("Error reading {path}"))]
    ReadSource {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the spreadsheet {locator}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        locator: String,
    },
    #[snafu(display("The sheet {sheet} is not in {locator} (found: {available:?})"))]
    MissingSheet {
        sheet: String,
        locator: String,
        available: Vec<String>,
    },
    #[snafu(display("The sheet {sheet} of {locator} is empty"))]
    EmptySheet { sheet: String, locator: String },
    #[snafu(display("Error parsing the CSV file {locator}"))]
    CsvParse {
        source: csv::Error,
        locator: String,
    },
    #[snafu(display("Error parsing the JSON content of {locator}"))]
    ParsingJson {
        source: serde_json::Error,
        locator: String,
    },
    #[snafu(display("Error opening the file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error accessing the cache directory {path}"))]
    CacheDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error processing the series of {what}"))]
    Series { source: SeriesError, what: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl DashError {
    /// True if a data source could not be fetched or parsed.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            DashError::Fetch { .. }
                | DashError::FetchStatus { .. }
                | DashError::ReadSource { .. }
                | DashError::OpeningExcel { .. }
                | DashError::MissingSheet { .. }
                | DashError::EmptySheet { .. }
                | DashError::CsvParse { .. }
                | DashError::ParsingJson { .. }
        )
    }
}

type DashResult<T> = Result<T, DashError>;

/// The choices of the user, after merging the command line and the
/// configuration file.
#[derive(PartialEq, Debug, Clone)]
struct Controls {
    scope: Scope,
    mode: Mode,
    scale: ChartScale,
    metric: Metric,
    regions: Vec<String>,
    countries: Vec<String>,
    date: NaiveDate,
    interactive: bool,
    policy: NegativeDeltaPolicy,
}

fn parse_date(date: &Option<String>) -> DashResult<NaiveDate> {
    match date {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Ok(d),
            Err(e) => whatever!("Cannot understand the date {:?} (expected YYYY-MM-DD): {}", s, e),
        },
        // The sources are updated with one day of delay.
        None => match Local::now().date_naive().checked_sub_days(Days::new(1)) {
            Some(d) => Ok(d),
            None => whatever!("Cannot compute the default date"),
        },
    }
}

fn make_controls(args: &Args, config: &DashConfig) -> DashResult<Controls> {
    let policy = match args.negative_deltas {
        Some(nd) => nd.into(),
        None => config.negative_delta_policy()?,
    };
    let countries = if args.countries.is_empty() {
        config.default_countries()
    } else {
        args.countries.clone()
    };
    Ok(Controls {
        scope: args.scope,
        mode: args.mode,
        scale: args.scale.into(),
        metric: args.metric.into(),
        regions: args.regions.clone(),
        countries,
        date: parse_date(&args.date)?,
        interactive: args.interactive,
        policy,
    })
}

fn make_reader(args: &Args, config: &DashConfig) -> SourceReader {
    let ttl = args.cache_ttl.unwrap_or_else(|| config.cache_ttl_seconds());
    if args.no_cache || ttl == 0 {
        info!("make_reader: the fetch cache is disabled");
        return SourceReader::new(None);
    }
    let dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.cache_dir());
    let cache = FetchCache::new(dir, ttl);
    match cache.purge_stale(FetchCache::now()) {
        Ok(n) if n > 0 => info!("make_reader: removed {} stale cache entries", n),
        Ok(_) => {}
        Err(e) => warn!("make_reader: could not purge the cache: {}", e),
    }
    let reader = SourceReader::new(Some(cache));
    if args.refresh {
        reader.refreshing()
    } else {
        reader
    }
}

// ******** Report *********

fn join_report_js(report: &JoinReport) -> JSValue {
    json!({
        "inputRows": report.input_rows,
        "outputRows": report.output_rows,
        "unmatchedEntities": report.unmatched_entities,
        "unusedReference": report.unused_reference,
    })
}

fn audit_js(crosswalk: &Crosswalk, audit: &Option<CrosswalkAudit>) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    res.insert("version".to_string(), json!(crosswalk.version));
    res.insert("entries".to_string(), json!(crosswalk.entries().len()));
    if let Some(a) = audit {
        res.insert("staleKeys".to_string(), json!(a.stale_keys));
        res.insert("unmapped".to_string(), json!(a.unmapped));
    }
    JSValue::Object(res)
}

fn chart_js(name: &str, spec: JSValue) -> JSValue {
    json!({ "name": name, "spec": spec })
}

// ******** National dashboard *********

fn national_dashboard(
    reader: &SourceReader,
    config: &DashConfig,
    controls: &Controls,
) -> DashResult<JSValue> {
    let locator = Locator::parse(&config.national_source());
    let bytes = reader.fetch(&locator)?;
    let table = io_xlsx::read_sheet(&bytes, &config.national_sheet(), &locator)?;
    info!(
        "national_dashboard: read {} regions from {}",
        table.len(),
        locator
    );

    let series = national_series(&table, &chilean_regions(), controls.policy).context(
        SeriesSnafu {
            what: locator.to_string(),
        },
    )?;
    if !series.report.is_clean() {
        warn!(
            "national_dashboard: {} regions without population: {:?}",
            series.report.unmatched_entities.len(),
            series.report.unmatched_entities
        );
    }

    let data = match controls.mode {
        Mode::Total => &series.cumulative,
        Mode::Daily => &series.daily,
    };
    let regions = if controls.regions.is_empty() {
        data.entities(REGION_TITLE)
            .context(SeriesSnafu { what: "regions" })?
    } else {
        controls.regions.clone()
    };
    debug!("national_dashboard: regions: {:?}", regions);

    let selected = data
        .filter_entities(REGION_TITLE, &regions)
        .context(SeriesSnafu { what: "regions" })?;
    if selected.is_empty() {
        warn!(
            "national_dashboard: no data for the regions {:?}",
            controls.regions
        );
    }

    let charts = vec![
        chart_js("global", national_global_chart(&selected, controls.scale)),
        chart_js(
            "regional",
            national_regional_chart(&selected, controls.scale),
        ),
        chart_js(
            "proportion",
            national_proportion_chart(&selected, controls.scale)?,
        ),
        chart_js(
            "regionsMap",
            regions_map(data, controls.date, controls.scale, &config.regions_geojson())?,
        ),
    ];

    Ok(json!({
        "scope": "national",
        "mode": controls.mode.name(),
        "metric": data.metric,
        "date": controls.date.format("%Y-%m-%d").to_string(),
        "charts": charts,
        "report": {
            "population": join_report_js(&series.report),
        }
    }))
}

// ******** International dashboard *********

fn read_jhu(reader: &SourceReader, source: &str) -> DashResult<WideTable> {
    let locator = Locator::parse(source);
    let bytes = reader.fetch(&locator)?;
    let table = io_csv::read_table(&bytes, &io_csv::CsvOptions::default(), &locator)?;
    info!("read_jhu: read {} rows from {}", table.len(), locator);
    Ok(table)
}

/// The countries of the world map, with their centroid.
fn read_country_table(reader: &SourceReader, config: &DashConfig) -> DashResult<(CountryTable, JoinReport)> {
    let codes_loc = Locator::parse(&config.country_codes_source());
    let codes = io_json::read_country_codes(&reader.fetch(&codes_loc)?, &codes_loc)?;
    let countries_loc = Locator::parse(&config.countries_source());
    let countries = io_csv::read_countries(&reader.fetch(&countries_loc)?, &countries_loc)?;
    Ok(CountryTable::from_parts(&codes, &countries))
}

fn international_dashboard(
    reader: &SourceReader,
    config: &DashConfig,
    controls: &Controls,
) -> DashResult<JSValue> {
    let confirmed = read_jhu(reader, &config.confirmed_source())?;
    let deaths = read_jhu(reader, &config.deaths_source())?;
    let recovered = read_jhu(reader, &config.recovered_source())?;

    let crosswalk = config.crosswalk()?;

    // The map is optional: the sources of the countries may be down while
    // the time series are still available.
    let mut degraded: Vec<String> = Vec::new();
    let reference = match read_country_table(reader, config) {
        Ok(r) => Some(r),
        Err(e) if e.is_data_unavailable() => {
            warn!(
                "international_dashboard: the map of the countries is not available: {}",
                e
            );
            degraded.push(format!("countriesMap: {}", e));
            None
        }
        Err(e) => return Err(e),
    };
    let reference_names = reference.as_ref().map(|(t, _)| t.names());

    let series = international_series(
        &confirmed,
        &deaths,
        &recovered,
        &crosswalk,
        reference_names.as_deref(),
        controls.policy,
    )
    .context(SeriesSnafu {
        what: "the international sources",
    })?;

    let metric = series.metric(controls.metric);
    let data = match controls.mode {
        Mode::Total => &metric.cumulative,
        Mode::Daily => &metric.daily,
    };

    let known = data
        .entities(COUNTRY)
        .context(SeriesSnafu { what: "countries" })?;
    for c in controls.countries.iter().filter(|c| !known.contains(c)) {
        warn!("international_dashboard: unknown country {:?}", c);
    }
    let selected = data
        .filter_entities(COUNTRY, &controls.countries)
        .context(SeriesSnafu { what: "countries" })?;

    let mut charts = vec![chart_js(
        "international",
        international_chart(&selected, controls.scale),
    )];

    let mut report: JSMap<String, JSValue> = JSMap::new();
    report.insert(
        "crosswalk".to_string(),
        audit_js(&crosswalk, &series.audit),
    );
    if let Some((countries, codes_report)) = reference {
        let (joined, join_report) = join_countries(data, COUNTRY, &countries)
            .context(SeriesSnafu { what: "countries" })?;
        charts.push(chart_js(
            "countriesMap",
            countries_map(
                &joined,
                controls.date,
                controls.interactive,
                controls.scale,
                &config.world_topojson(),
            )?,
        ));
        report.insert("countryCodes".to_string(), join_report_js(&codes_report));
        report.insert("countries".to_string(), join_report_js(&join_report));
    }
    report.insert("degraded".to_string(), json!(degraded));

    Ok(json!({
        "scope": "international",
        "mode": controls.mode.name(),
        "metric": data.metric,
        "date": controls.date.format("%Y-%m-%d").to_string(),
        "charts": charts,
        "report": report,
    }))
}

// ******** Entry point *********

fn build_dashboard(args: &Args, config: &DashConfig) -> DashResult<JSValue> {
    let controls = make_controls(args, config)?;
    info!("controls: {:?}", controls);
    let reader = make_reader(args, config);
    match controls.scope {
        Scope::National => national_dashboard(&reader, config, &controls),
        Scope::International => international_dashboard(&reader, config, &controls),
    }
}

fn write_output(out: &Option<String>, pretty_js: &str) -> DashResult<()> {
    match out.as_deref() {
        None | Some("stdout") => {
            println!("{}", pretty_js);
            Ok(())
        }
        Some(path) => {
            info!("write_output: writing the dashboard to {}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })
        }
    }
}

pub fn run_dashboard(args: &Args) -> DashResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => DashConfig::default(),
    };
    debug!("config: {:?}", config);

    let dashboard = build_dashboard(args, &config)?;
    let pretty_js = serde_json::to_string_pretty(&dashboard).context(ParsingJsonSnafu {
        locator: "the dashboard",
    })?;
    write_output(&args.out, &pretty_js)?;

    // The reference dashboard, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let reference = read_reference(reference_p)?;
        let pretty_js_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {
                locator: reference_p,
            })?;
        // Both sides go through the same parser, so that the floats are printed the same way.
        let reparsed: JSValue = serde_json::from_str(&pretty_js).context(ParsingJsonSnafu {
            locator: "the dashboard",
        })?;
        let pretty_js_check = serde_json::to_string_pretty(&reparsed).context(ParsingJsonSnafu {
            locator: "the dashboard",
        })?;
        if pretty_js_reference != pretty_js_check {
            warn!("Found differences with the reference dashboard");
            print_diff(pretty_js_reference.as_str(), pretty_js_check.as_str(), "\n");
            whatever!("Difference detected between the dashboard and the reference dashboard")
        }
        info!("The dashboard matches the reference {}", reference_p);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{MetricArg, NegativeDeltas, ScaleArg};
    use std::path::PathBuf;

    const CONFIRMED_CSV: &str = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Chile,-35.6751,-71.543,0,1,3
,\"Korea, South\",35.9078,127.7669,3,8,8
Ontario,Canada,51.2538,-85.3232,1,2,2
Quebec,Canada,52.9399,-73.5491,0,1,5
,Diamond Princess,0,0,700,705,705
";

    const DEATHS_CSV: &str = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Chile,-35.6751,-71.543,0,0,1
";

    const COUNTRIES_CSV: &[u8] = b"code;lat;lon;name\nCL;-35.675147;-71.542969;Chile\nKR;35.907757;127.766922;South Korea\nCA;56.130366;-106.346771;Canada\n";

    const CODES_JSON: &str = r#"[{"code": "CL", "id": 152, "name": "Chile"},
        {"code": "KR", "id": 410, "name": "Korea, Republic of"},
        {"code": "CA", "id": 124, "name": "Canada"}]"#;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("covidash-dash-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn args(config: Option<String>) -> Args {
        Args {
            scope: Scope::International,
            mode: Mode::Total,
            scale: ScaleArg::Linear,
            metric: MetricArg::Confirmed,
            regions: vec![],
            countries: vec!["Chile".to_string(), "South Korea".to_string(), "Peru".to_string()],
            date: Some("2020-03-03".to_string()),
            interactive: true,
            negative_deltas: Some(NegativeDeltas::PassThrough),
            config,
            out: None,
            reference: None,
            cache_dir: None,
            cache_ttl: None,
            no_cache: true,
            refresh: false,
            verbose: false,
        }
    }

    fn offline_config(dir: &PathBuf, with_reference: bool) -> DashConfig {
        let write = |name: &str, content: &[u8]| {
            let p = dir.join(name);
            fs::write(&p, content).unwrap();
            p.display().to_string()
        };
        let confirmed = write("confirmed.csv", CONFIRMED_CSV.as_bytes());
        let deaths = write("deaths.csv", DEATHS_CSV.as_bytes());
        let countries = write("countries.csv", COUNTRIES_CSV);
        let codes = if with_reference {
            write("codes.json", CODES_JSON.as_bytes())
        } else {
            dir.join("missing.json").display().to_string()
        };
        DashConfig {
            confirmed_source: Some(confirmed),
            deaths_source: Some(deaths.clone()),
            recovered_source: Some(deaths),
            countries_source: Some(countries),
            country_codes_source: Some(codes),
            ..DashConfig::default()
        }
    }

    #[test]
    fn international_offline() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = test_dir("international");
        let config = offline_config(&dir, true);
        let js = build_dashboard(&args(None), &config).unwrap();

        assert_eq!(js["scope"], json!("international"));
        assert_eq!(js["metric"], json!("confirmed"));
        assert_eq!(js["date"], json!("2020-03-03"));
        let charts = js["charts"].as_array().unwrap();
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0]["name"], json!("international"));
        assert_eq!(charts[1]["name"], json!("countriesMap"));

        let report = &js["report"];
        assert_eq!(report["countries"]["unmatchedEntities"], json!(["Diamond Princess"]));
        assert_eq!(report["crosswalk"]["version"], json!(1));
        assert_eq!(report["crosswalk"]["unmapped"], json!(["Diamond Princess"]));
        assert_eq!(report["degraded"], json!([]));
    }

    #[test]
    fn international_without_the_map() {
        let dir = test_dir("degraded");
        let config = offline_config(&dir, false);
        let js = build_dashboard(&args(None), &config).unwrap();
        let charts = js["charts"].as_array().unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(js["report"]["degraded"].as_array().unwrap().len(), 1);
        assert!(js["report"].get("countries").is_none());
    }

    #[test]
    fn missing_case_source_fails() {
        let dir = test_dir("missing");
        let mut config = offline_config(&dir, true);
        config.deaths_source = Some(dir.join("nothing.csv").display().to_string());
        let res = build_dashboard(&args(None), &config);
        match res {
            Err(e) => assert!(e.is_data_unavailable()),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn reference_check() {
        let dir = test_dir("reference");
        let config = offline_config(&dir, true);
        let config_p = dir.join("config.json");
        fs::write(&config_p, serde_json::to_string(&config).unwrap()).unwrap();
        let out_p = dir.join("dashboard.json");

        let mut a = args(Some(config_p.display().to_string()));
        a.out = Some(out_p.display().to_string());
        run_dashboard(&a).unwrap();

        // Same options: the output is its own reference.
        a.reference = Some(out_p.display().to_string());
        a.out = Some(dir.join("dashboard2.json").display().to_string());
        run_dashboard(&a).unwrap();

        a.mode = Mode::Daily;
        assert!(run_dashboard(&a).is_err());
    }

    #[test]
    fn dates() {
        assert_eq!(
            parse_date(&Some("2020-04-01".to_string())).unwrap(),
            NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()
        );
        assert!(parse_date(&Some("01-04-2020".to_string())).is_err());
        assert!(parse_date(&None).unwrap() < Local::now().date_naive());
    }
}
