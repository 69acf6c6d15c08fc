use clap::{Parser, ValueEnum};

use case_series::{Metric, NegativeDeltaPolicy};

use crate::dash::ChartScale;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    National,
    International,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Total,
    Daily,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Total => "total",
            Mode::Daily => "daily",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleArg {
    Linear,
    Log,
}

impl From<ScaleArg> for ChartScale {
    fn from(s: ScaleArg) -> Self {
        match s {
            ScaleArg::Linear => ChartScale::Linear,
            ScaleArg::Log => ChartScale::Log,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricArg {
    Confirmed,
    Deaths,
    Recovered,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Confirmed => Metric::Confirmed,
            MetricArg::Deaths => Metric::Deaths,
            MetricArg::Recovered => Metric::Recovered,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeDeltas {
    PassThrough,
    Clamp,
}

impl From<NegativeDeltas> for NegativeDeltaPolicy {
    fn from(n: NegativeDeltas) -> Self {
        match n {
            NegativeDeltas::PassThrough => NegativeDeltaPolicy::PassThrough,
            NegativeDeltas::Clamp => NegativeDeltaPolicy::Clamp,
        }
    }
}

/// This is a dashboard of the COVID-19 cases in Chile and around the world.
///
/// The charts are written as Vega-Lite specifications in a JSON document.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (default national) The cases of the regions of Chile, or the comparison between countries.
    #[clap(long, value_enum, default_value = "national")]
    pub scope: Scope,

    /// (default total) The cumulative counts, or the daily counts.
    #[clap(long, value_enum, default_value = "total")]
    pub mode: Mode,

    /// (default linear) The scale of the values in the charts.
    #[clap(long, value_enum, default_value = "linear")]
    pub scale: ScaleArg,

    /// (default confirmed) The metric of the international charts.
    #[clap(long, value_enum, default_value = "confirmed")]
    pub metric: MetricArg,

    /// (repeatable, default all the regions) A region to include in the national charts.
    #[clap(long = "regions", value_parser)]
    pub regions: Vec<String>,

    /// (repeatable, default Chile, Cuba, Mexico, Brazil and Argentina) A country to include in the
    /// international chart.
    #[clap(long = "countries", value_parser)]
    pub countries: Vec<String>,

    /// (YYYY-MM-DD, default yesterday) The date shown in the maps.
    #[clap(short, long, value_parser)]
    pub date: Option<String>,

    /// If passed as an argument, the map of the countries highlights the country under the mouse.
    #[clap(long, takes_value = false)]
    pub interactive: bool,

    /// (default pass-through) What to do with the negative daily counts, which appear when a
    /// cumulative count is corrected downwards.
    #[clap(long, value_enum)]
    pub negative_deltas: Option<NegativeDeltas>,

    /// (file path, optional) A configuration file in JSON. See the manual of case_series for the
    /// options.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the dashboard in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference dashboard in JSON format. If provided, covidash will check that
    /// the dashboard matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (directory, default .covidash-cache) Where the fetched sources are cached.
    #[clap(long, value_parser)]
    pub cache_dir: Option<String>,

    /// (seconds, default 3600) How long the fetched sources are kept. 0 disables the cache.
    #[clap(long, value_parser)]
    pub cache_ttl: Option<u64>,

    /// If passed as an argument, the sources are always fetched.
    #[clap(long, takes_value = false)]
    pub no_cache: bool,

    /// If passed as an argument, the cached copies of the sources are dropped and fetched again.
    #[clap(long, takes_value = false)]
    pub refresh: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["covidash"]);
        assert_eq!(args.scope, Scope::National);
        assert_eq!(args.mode, Mode::Total);
        assert_eq!(args.scale, ScaleArg::Linear);
        assert_eq!(args.negative_deltas, None);
        assert!(args.regions.is_empty());
        assert!(!args.no_cache);
    }

    #[test]
    fn controls() {
        let args = Args::parse_from([
            "covidash",
            "--scope",
            "international",
            "--mode",
            "daily",
            "--scale",
            "log",
            "--metric",
            "deaths",
            "--countries",
            "Chile",
            "--countries",
            "South Korea",
            "--negative-deltas",
            "clamp",
            "--interactive",
            "--cache-ttl",
            "0",
        ]);
        assert_eq!(args.scope, Scope::International);
        assert_eq!(args.mode, Mode::Daily);
        assert_eq!(ChartScale::from(args.scale), ChartScale::Log);
        assert_eq!(Metric::from(args.metric), Metric::Deaths);
        assert_eq!(args.countries, vec!["Chile", "South Korea"]);
        assert_eq!(
            args.negative_deltas.map(NegativeDeltaPolicy::from),
            Some(NegativeDeltaPolicy::Clamp)
        );
        assert!(args.interactive);
        assert_eq!(args.cache_ttl, Some(0));
    }
}
