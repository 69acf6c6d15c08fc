mod config;
mod crosswalk;
mod delta;
mod melt;
mod reference;
mod table;

pub mod builder;
pub mod manual;

use log::{debug, info};

pub use crate::config::*;
pub use crate::crosswalk::{Crosswalk, CrosswalkAudit};
pub use crate::delta::{cumulate, daily_deltas};
pub use crate::melt::{melt, LongTable, Observation};
pub use crate::reference::*;
pub use crate::table::{DateColumn, WideTable};

// ******** Output data structures *********

/// The national series, with the population of each region.
#[derive(PartialEq, Debug, Clone)]
pub struct NationalSeries {
    pub cumulative: LongTable,
    pub daily: LongTable,
    /// The outcome of the population join (the same for both tables).
    pub report: JoinReport,
}

/// The cumulative and daily series of one metric.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricSeries {
    pub cumulative: LongTable,
    pub daily: LongTable,
}

#[derive(PartialEq, Debug, Clone)]
pub struct InternationalSeries {
    pub confirmed: MetricSeries,
    pub deaths: MetricSeries,
    pub recovered: MetricSeries,
    /// The crosswalk audit against the confirmed cases, if a reference of
    /// country names was provided.
    pub audit: Option<CrosswalkAudit>,
}

/// The metrics of the international sources.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Metric {
    Confirmed,
    Deaths,
    Recovered,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Confirmed, Metric::Deaths, Metric::Recovered];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Confirmed => CONFIRMED,
            Metric::Deaths => DEATHS,
            Metric::Recovered => RECOVERED,
        }
    }
}

impl InternationalSeries {
    pub fn metric(&self, metric: Metric) -> &MetricSeries {
        match metric {
            Metric::Confirmed => &self.confirmed,
            Metric::Deaths => &self.deaths,
            Metric::Recovered => &self.recovered,
        }
    }
}

// ******** Pipelines *********

/// Runs the pipeline on the national spreadsheet.
///
/// Arguments:
/// * `table` the sheet, one row per region, one column per date (`DD-MM-YYYY`)
/// * `regions` the population of each region
/// * `policy` the treatment of negative daily counts
pub fn national_series(
    table: &WideTable,
    regions: &[RegionPopulation],
    policy: NegativeDeltaPolicy,
) -> SeriesResult<NationalSeries> {
    let layout = DateLayout::national();
    info!(
        "national_series: processing {} regions, {} columns",
        table.len(),
        table.columns().len()
    );
    // Fails early on a sheet without the region names.
    table.column_index(REGION_TITLE)?;
    if table.date_columns(&layout)?.is_empty() {
        return Err(SeriesError::NoDateColumns);
    }

    let daily = daily_deltas(table, &layout, policy)?;
    let (cumulative, report) =
        join_population(melt(table, &layout, NATIONAL_METRIC)?, regions)?;
    let (daily, _) = join_population(melt(&daily, &layout, NATIONAL_METRIC)?, regions)?;

    Ok(NationalSeries {
        cumulative,
        daily,
        report,
    })
}

/// Prepares one of the international time series: drops the descriptive
/// columns, normalizes the country names and sums the rows of the same
/// country (the provinces of a country, for instance).
pub fn prepare_international(table: &WideTable, crosswalk: &Crosswalk) -> SeriesResult<WideTable> {
    let mut res = table.drop_columns(&[PROVINCE_STATE, LATITUDE, LONGITUDE]);
    res.map_text(COUNTRY_REGION, |name| crosswalk.apply(name).to_string())?;
    let res = res.aggregate_by(COUNTRY_REGION)?;
    debug!(
        "prepare_international: {} rows -> {} countries",
        table.len(),
        res.len()
    );
    Ok(res)
}

fn metric_series(
    table: &WideTable,
    crosswalk: &Crosswalk,
    metric: Metric,
    policy: NegativeDeltaPolicy,
) -> SeriesResult<MetricSeries> {
    let layout = DateLayout::international();
    let mut prepared = prepare_international(table, crosswalk)?;
    if prepared.date_columns(&layout)?.is_empty() {
        return Err(SeriesError::NoDateColumns);
    }
    prepared.rename_column(COUNTRY_REGION, COUNTRY)?;
    let daily = daily_deltas(&prepared, &layout, policy)?;
    Ok(MetricSeries {
        cumulative: melt(&prepared, &layout, metric.name())?,
        daily: melt(&daily, &layout, metric.name())?,
    })
}

/// Runs the pipeline on the three international time series.
///
/// If `reference_names` is given, the crosswalk is audited against the raw
/// country names of the confirmed cases.
pub fn international_series(
    confirmed: &WideTable,
    deaths: &WideTable,
    recovered: &WideTable,
    crosswalk: &Crosswalk,
    reference_names: Option<&[String]>,
    policy: NegativeDeltaPolicy,
) -> SeriesResult<InternationalSeries> {
    crosswalk.validate()?;
    info!(
        "international_series: crosswalk v{} with {} substitutions",
        crosswalk.version,
        crosswalk.entries().len()
    );
    let audit = match reference_names {
        Some(names) => Some(crosswalk.audit(&confirmed.entities(COUNTRY_REGION)?, names)),
        None => None,
    };
    Ok(InternationalSeries {
        confirmed: metric_series(confirmed, crosswalk, Metric::Confirmed, policy)?,
        deaths: metric_series(deaths, crosswalk, Metric::Deaths, policy)?,
        recovered: metric_series(recovered, crosswalk, Metric::Recovered, policy)?,
        audit,
    })
}
