use crate::dash::*;

use serde::{Deserialize, Serialize};

// The public sources of the dashboard.
pub const NATIONAL_SOURCE: &str =
    "https://github.com/rubens36/covid19/blob/master/data/Infectados%20Covid%20Chile.xlsx?raw=true";
pub const NATIONAL_SHEET: &str = "original";
const JHU_BASE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";
pub const COUNTRIES_SOURCE: &str =
    "https://raw.githubusercontent.com/rubens36/covid19/master/data/countries.csv";
pub const COUNTRY_CODES_SOURCE: &str = "https://raw.githubusercontent.com/alisle/world-110m-country-codes/master/world-110m-country-codes.json";
pub const REGIONS_GEOJSON: &str =
    "https://raw.githubusercontent.com/rubens36/covid19/master/maps/regiones.geojson";
pub const WORLD_TOPOJSON: &str = "https://cdn.jsdelivr.net/npm/vega-datasets@v1.29.0/data/world-110m.json";

pub const DEFAULT_COUNTRIES: [&str; 5] = ["Chile", "Cuba", "Mexico", "Brazil", "Argentina"];
pub const CACHE_DIR: &str = ".covidash-cache";
pub const CACHE_TTL_SECONDS: u64 = 3600;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(rename = "nationalSource")]
    pub national_source: Option<String>,
    #[serde(rename = "nationalSheet")]
    pub national_sheet: Option<String>,
    #[serde(rename = "confirmedSource")]
    pub confirmed_source: Option<String>,
    #[serde(rename = "deathsSource")]
    pub deaths_source: Option<String>,
    #[serde(rename = "recoveredSource")]
    pub recovered_source: Option<String>,
    #[serde(rename = "countriesSource")]
    pub countries_source: Option<String>,
    #[serde(rename = "countryCodesSource")]
    pub country_codes_source: Option<String>,
    #[serde(rename = "regionsGeojson")]
    pub regions_geojson: Option<String>,
    #[serde(rename = "worldTopojson")]
    pub world_topojson: Option<String>,
    #[serde(rename = "defaultCountries")]
    pub default_countries: Option<Vec<String>>,
    #[serde(rename = "negativeDeltas")]
    pub negative_deltas: Option<String>,
    // Added to the built-in substitutions of country names.
    #[serde(rename = "crosswalk")]
    pub crosswalk: Option<Vec<(String, String)>>,
    #[serde(rename = "cacheDir")]
    pub cache_dir: Option<String>,
    #[serde(rename = "cacheTtlSeconds")]
    pub cache_ttl_seconds: Option<u64>,
}

fn jhu_source(metric: &str) -> String {
    format!("{}/time_series_covid19_{}_global.csv", JHU_BASE, metric)
}

fn or_default(x: &Option<String>, default: &'static str) -> String {
    x.clone().unwrap_or_else(|| default.to_string())
}

impl DashConfig {
    pub fn national_source(&self) -> String {
        or_default(&self.national_source, NATIONAL_SOURCE)
    }

    pub fn national_sheet(&self) -> String {
        or_default(&self.national_sheet, NATIONAL_SHEET)
    }

    pub fn confirmed_source(&self) -> String {
        self.confirmed_source
            .clone()
            .unwrap_or_else(|| jhu_source(CONFIRMED))
    }

    pub fn deaths_source(&self) -> String {
        self.deaths_source
            .clone()
            .unwrap_or_else(|| jhu_source(DEATHS))
    }

    pub fn recovered_source(&self) -> String {
        self.recovered_source
            .clone()
            .unwrap_or_else(|| jhu_source(RECOVERED))
    }

    pub fn countries_source(&self) -> String {
        or_default(&self.countries_source, COUNTRIES_SOURCE)
    }

    pub fn country_codes_source(&self) -> String {
        or_default(&self.country_codes_source, COUNTRY_CODES_SOURCE)
    }

    pub fn regions_geojson(&self) -> String {
        or_default(&self.regions_geojson, REGIONS_GEOJSON)
    }

    pub fn world_topojson(&self) -> String {
        or_default(&self.world_topojson, WORLD_TOPOJSON)
    }

    pub fn default_countries(&self) -> Vec<String> {
        match &self.default_countries {
            Some(l) => l.clone(),
            None => DEFAULT_COUNTRIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn cache_dir(&self) -> String {
        or_default(&self.cache_dir, CACHE_DIR)
    }

    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache_ttl_seconds.unwrap_or(CACHE_TTL_SECONDS)
    }

    pub fn negative_delta_policy(&self) -> DashResult<NegativeDeltaPolicy> {
        match self.negative_deltas.as_deref() {
            None | Some("pass-through") => Ok(NegativeDeltaPolicy::PassThrough),
            Some("clamp") => Ok(NegativeDeltaPolicy::Clamp),
            Some(x) => whatever!(
                "unknown negativeDeltas option: {:?} (expected pass-through or clamp)",
                x
            ),
        }
    }

    /// The built-in substitutions, extended with the ones of the configuration.
    pub fn crosswalk(&self) -> DashResult<Crosswalk> {
        let builtin = Crosswalk::builtin();
        match &self.crosswalk {
            Some(extra) if !extra.is_empty() => {
                info!(
                    "crosswalk: adding {} substitutions to the built-in table",
                    extra.len()
                );
                builtin.extend(extra).context(SeriesSnafu {
                    what: "the crosswalk of the configuration",
                })
            }
            _ => Ok(builtin),
        }
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { locator: path })?;
    Ok(config)
}

pub fn read_reference(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { locator: path })?;
    debug!("read_reference: {} charts", js["charts"].as_array().map(|l| l.len()).unwrap_or(0));
    Ok(js)
}
