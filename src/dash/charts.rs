// Vega-Lite specifications of the charts of the dashboard.
//
// The data is inlined in the specifications, except for the shapes of the
// maps which are referenced by URL.

use crate::dash::*;

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v4.json";
const DATE_FIELD: &str = "date";
const PROPORTION_FIELD: &str = "proportion";
const COLOR_SCHEME: &str = "teals";

const LINE_WIDTH: u32 = 800;
const LINE_HEIGHT: u32 = 250;
const MAP_SIZE: u32 = 600;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ChartScale {
    Linear,
    Log,
}

impl ChartScale {
    fn name(&self) -> &'static str {
        match self {
            ChartScale::Linear => "linear",
            ChartScale::Log => "log",
        }
    }

    fn axis_js(&self) -> JSValue {
        json!({ "type": self.name() })
    }

    fn color_js(&self) -> JSValue {
        json!({ "type": self.name(), "scheme": COLOR_SCHEME })
    }
}

fn cell_js(cell: &Cell) -> JSValue {
    match cell {
        Cell::Text(s) => json!(s),
        Cell::Count(c) => json!(c),
        Cell::Number(n) => json!(n),
        Cell::Missing => JSValue::Null,
    }
}

fn date_js(date: NaiveDate) -> JSValue {
    json!(date.format("%Y-%m-%d").to_string())
}

/// One record per observation: the identifier columns, the date and the value.
fn records(table: &LongTable) -> Vec<JSMap<String, JSValue>> {
    table
        .rows
        .iter()
        .map(|obs| {
            let mut m: JSMap<String, JSValue> = JSMap::new();
            for (name, cell) in table.columns.iter().zip(obs.ids.iter()) {
                m.insert(name.clone(), cell_js(cell));
            }
            m.insert(DATE_FIELD.to_string(), date_js(obs.date));
            m.insert(table.metric.clone(), json!(obs.value));
            m
        })
        .collect()
}

fn values_js(records: Vec<JSMap<String, JSValue>>) -> JSValue {
    JSValue::Array(records.into_iter().map(JSValue::Object).collect())
}

fn positive_filter(field: &str) -> JSValue {
    json!({ "filter": format!("datum['{}'] > 0", field) })
}

fn metric_title(metric: &str) -> String {
    match metric {
        NATIONAL_METRIC | CONFIRMED => "Confirmed cases".to_string(),
        DEATHS => "Deaths".to_string(),
        RECOVERED => "Recovered".to_string(),
        x => x.to_string(),
    }
}

/// A line chart over time, with the zoom bound to the scales.
fn line_chart(
    title: &str,
    values: JSValue,
    transform: Vec<JSValue>,
    encoding: JSValue,
    height: u32,
) -> JSValue {
    json!({
        "$schema": SCHEMA,
        "title": title,
        "width": LINE_WIDTH,
        "height": height,
        "data": { "values": values },
        "transform": transform,
        "mark": { "type": "line", "point": { "size": 70 } },
        "encoding": encoding,
        "selection": { "zoom": { "type": "interval", "bind": "scales" } },
        "config": {
            "scale": { "continuousPadding": 5 },
            "legend": {
                "fillColor": "white",
                "columns": 8,
                "strokeWidth": 2,
                "strokeColor": "#f63366",
                "cornerRadius": 5,
                "padding": 10,
                "orient": "bottom"
            }
        }
    })
}

fn date_axis() -> JSValue {
    json!({ "field": DATE_FIELD, "type": "temporal", "title": "Date" })
}

fn log_filter(scale: ChartScale, field: &str) -> Vec<JSValue> {
    match scale {
        ChartScale::Log => vec![positive_filter(field)],
        ChartScale::Linear => vec![],
    }
}

// ******** National charts *********

/// The total of the selected regions, per date.
pub fn national_global_chart(selected: &LongTable, scale: ChartScale) -> JSValue {
    let metric = selected.metric.as_str();
    let values: Vec<JSValue> = selected
        .totals_by_date()
        .into_iter()
        .map(|(date, total)| json!({ DATE_FIELD: date_js(date), metric: total }))
        .collect();
    line_chart(
        &format!("{}: total", metric_title(metric)),
        JSValue::Array(values),
        log_filter(scale, metric),
        json!({
            "x": date_axis(),
            "y": { "field": metric, "type": "quantitative", "title": metric_title(metric), "scale": scale.axis_js() },
            "tooltip": [
                { "field": metric, "type": "quantitative", "title": metric_title(metric) },
                { "field": DATE_FIELD, "type": "temporal", "title": "Date" }
            ]
        }),
        LINE_HEIGHT,
    )
}

/// One line per selected region.
pub fn national_regional_chart(selected: &LongTable, scale: ChartScale) -> JSValue {
    let metric = selected.metric.as_str();
    line_chart(
        &format!("{} by region", metric_title(metric)),
        values_js(records(selected)),
        log_filter(scale, metric),
        json!({
            "x": date_axis(),
            "y": { "field": metric, "type": "quantitative", "title": metric_title(metric), "scale": scale.axis_js() },
            "color": { "field": REGION_TITLE, "type": "nominal", "title": "Region", "legend": null },
            "tooltip": [
                { "field": REGION_TITLE, "type": "nominal", "title": "Region" },
                { "field": metric, "type": "quantitative", "title": metric_title(metric) },
                { "field": DATE_FIELD, "type": "temporal", "title": "Date" }
            ]
        }),
        LINE_HEIGHT,
    )
}

/// The cases per 100k inhabitants of each selected region.
pub fn national_proportion_chart(selected: &LongTable, scale: ChartScale) -> DashResult<JSValue> {
    let metric = selected.metric.as_str();
    let pop_idx = selected.column_index(POPULATION).context(SeriesSnafu {
        what: "the proportion chart",
    })?;
    let mut recs = records(selected);
    for (rec, obs) in recs.iter_mut().zip(selected.rows.iter()) {
        let population = obs.ids[pop_idx].as_count().map(|p| p.max(0) as u64);
        let proportion = obs.value.and_then(|v| per_100k(v, population));
        rec.insert(PROPORTION_FIELD.to_string(), json!(proportion));
    }
    Ok(line_chart(
        &format!("{} per 100k inhabitants", metric_title(metric)),
        values_js(recs),
        log_filter(scale, PROPORTION_FIELD),
        json!({
            "x": date_axis(),
            "y": { "field": PROPORTION_FIELD, "type": "quantitative", "title": "Cases / 100k", "scale": scale.axis_js() },
            "color": { "field": REGION_TITLE, "type": "nominal", "title": "Region" },
            "tooltip": [
                { "field": REGION_TITLE, "type": "nominal", "title": "Region" },
                { "field": metric, "type": "quantitative", "title": metric_title(metric) },
                { "field": POPULATION, "type": "quantitative", "title": "Population" },
                { "field": PROPORTION_FIELD, "type": "quantitative", "title": "Proportion", "format": ".2f" },
                { "field": DATE_FIELD, "type": "temporal", "title": "Date" }
            ]
        }),
        350,
    ))
}

/// The regions of Chile, coloured by the value on the given date.
pub fn regions_map(
    data: &LongTable,
    date: NaiveDate,
    scale: ChartScale,
    geojson_url: &str,
) -> DashResult<JSValue> {
    let metric = data.metric.as_str();
    let id_idx = data.column_index(REGION_ID).context(SeriesSnafu {
        what: "the map of the regions",
    })?;
    let day = data.on_date(date);
    if day.is_empty() {
        warn!("regions_map: no data on {}", date);
    }
    let chart_data: Vec<JSValue> = day
        .rows
        .iter()
        .filter(|obs| obs.value.map(|v| v > 0).unwrap_or(false))
        .map(|obs| json!({ "id": cell_js(&obs.ids[id_idx]), metric: obs.value }))
        .collect();
    debug!("regions_map: {} regions with cases on {}", chart_data.len(), date);

    let shapes = json!({ "url": geojson_url, "format": { "type": "json", "property": "features" } });
    let lookup = json!([{
        "lookup": "properties.id",
        "from": { "data": { "values": chart_data }, "key": "id", "fields": [metric] }
    }]);
    let region_tooltip = json!({ "field": "properties.Region", "type": "nominal", "title": "Region" });
    let value_tooltip = json!({ "field": metric, "type": "quantitative", "title": metric_title(metric) });

    Ok(json!({
        "$schema": SCHEMA,
        "title": format!("{} by region on {}", metric_title(metric), date.format("%Y-%m-%d")),
        "width": MAP_SIZE,
        "height": MAP_SIZE,
        "config": { "view": { "strokeWidth": 0 } },
        "layer": [
            {
                "data": shapes,
                "mark": { "type": "geoshape", "stroke": "black", "strokeWidth": 0.5, "color": "white" },
                "encoding": { "tooltip": [region_tooltip] }
            },
            {
                "data": shapes,
                "transform": lookup,
                "mark": { "type": "geoshape", "stroke": "black", "strokeWidth": 0.5 },
                "encoding": {
                    "color": { "field": metric, "type": "quantitative", "title": metric_title(metric), "scale": scale.color_js() },
                    "tooltip": [region_tooltip, value_tooltip]
                }
            },
            {
                "data": shapes,
                "transform": lookup,
                "selection": { "highlight": { "type": "single", "on": "mouseover" } },
                "mark": { "type": "circle", "opacity": 0.4, "color": "red" },
                "encoding": {
                    "longitude": { "field": "properties.centroid_lon", "type": "quantitative" },
                    "latitude": { "field": "properties.centroid_lat", "type": "quantitative" },
                    "size": {
                        "condition": {
                            "selection": "highlight",
                            "field": metric,
                            "type": "quantitative",
                            "scale": { "range": [50, 4000] },
                            "legend": null
                        },
                        "value": 0
                    },
                    "tooltip": [region_tooltip, value_tooltip]
                }
            }
        ]
    }))
}

// ******** International charts *********

/// One line per selected country. Only the positive values are drawn.
pub fn international_chart(selected: &LongTable, scale: ChartScale) -> JSValue {
    let metric = selected.metric.as_str();
    line_chart(
        "Comparison by country",
        values_js(records(selected)),
        vec![positive_filter(metric)],
        json!({
            "x": date_axis(),
            "y": { "field": metric, "type": "quantitative", "title": metric_title(metric), "scale": scale.axis_js() },
            "color": { "field": COUNTRY, "type": "nominal", "title": "Country", "legend": null },
            "tooltip": [
                { "field": COUNTRY, "type": "nominal", "title": "Country" },
                { "field": metric, "type": "quantitative", "title": metric_title(metric) },
                { "field": DATE_FIELD, "type": "temporal", "title": "Date" }
            ]
        }),
        LINE_HEIGHT,
    )
}

/// The countries of the world, coloured by the value on the given date, with
/// a circle at the centroid of each country.
///
/// `joined` is a table joined with the countries reference.
pub fn countries_map(
    joined: &LongTable,
    date: NaiveDate,
    interactive: bool,
    scale: ChartScale,
    topojson_url: &str,
) -> DashResult<JSValue> {
    let metric = joined.metric.as_str();
    for column in [MAP_ID, COUNTRY_CODE] {
        joined.column_index(column).context(SeriesSnafu {
            what: "the map of the countries",
        })?;
    }
    let lat_idx = joined.column_index(CENTROID_LAT).context(SeriesSnafu {
        what: "the map of the countries",
    })?;
    let lon_idx = joined.column_index(CENTROID_LON).context(SeriesSnafu {
        what: "the map of the countries",
    })?;
    let on_date = joined.on_date(date);
    // A country without a centroid cannot be placed on the map.
    let located = on_date.filter(|obs| !obs.ids[lat_idx].is_missing() && !obs.ids[lon_idx].is_missing());
    if located.len() < on_date.len() {
        warn!(
            "countries_map: {} countries without a centroid are left out",
            on_date.len() - located.len()
        );
    }
    let day = located.filter(|obs| match (scale, obs.value) {
        (_, None) => false,
        (ChartScale::Log, Some(v)) => v > 0,
        (ChartScale::Linear, Some(_)) => true,
    });
    if day.is_empty() {
        warn!("countries_map: no data on {}", date);
    }
    debug!("countries_map: {} countries on {}", day.len(), date);
    let chart_data = values_js(records(&day));

    let shapes = json!({ "url": topojson_url, "format": { "type": "topojson", "feature": "countries" } });
    let selection = if interactive {
        json!({ "type": "single", "on": "mouseover", "nearest": true, "fields": [COUNTRY], "empty": "all" })
    } else {
        json!({ "type": "single" })
    };

    Ok(json!({
        "$schema": SCHEMA,
        "title": format!("{} by country on {}", metric_title(metric), date.format("%Y-%m-%d")),
        "width": 800,
        "height": 500,
        "projection": { "type": "naturalEarth1" },
        "config": { "view": { "stroke": null } },
        "layer": [
            {
                "data": { "sphere": true },
                "mark": { "type": "geoshape", "fill": "lightblue" }
            },
            {
                "data": { "graticule": true },
                "mark": { "type": "geoshape", "stroke": "white", "strokeWidth": 0.5 }
            },
            {
                "data": shapes,
                "transform": [{
                    "lookup": "id",
                    "from": { "data": { "values": chart_data }, "key": MAP_ID, "fields": [COUNTRY_CODE, COUNTRY, metric] }
                }],
                "mark": { "type": "geoshape" },
                "encoding": {
                    "color": { "field": metric, "type": "quantitative", "title": metric_title(metric), "scale": scale.color_js(), "legend": null },
                    "tooltip": [
                        { "field": COUNTRY, "type": "nominal", "title": "Country" },
                        { "field": COUNTRY_CODE, "type": "nominal", "title": "Code" },
                        { "field": metric, "type": "quantitative", "title": metric_title(metric) }
                    ]
                }
            },
            {
                "data": shapes,
                "transform": [{
                    "lookup": "id",
                    "from": {
                        "data": { "values": chart_data },
                        "key": MAP_ID,
                        "fields": [COUNTRY_CODE, COUNTRY, metric, CENTROID_LAT, CENTROID_LON]
                    }
                }],
                "selection": { "highlight": selection },
                "mark": { "type": "circle", "opacity": 0.4, "color": "red" },
                "encoding": {
                    "longitude": { "field": CENTROID_LON, "type": "quantitative" },
                    "latitude": { "field": CENTROID_LAT, "type": "quantitative" },
                    "size": {
                        "condition": {
                            "selection": "highlight",
                            "field": metric,
                            "type": "quantitative",
                            "scale": { "range": [50, 4000] },
                            "legend": null
                        },
                        "value": 0
                    },
                    "tooltip": [
                        { "field": COUNTRY, "type": "nominal", "title": "Country" },
                        { "field": COUNTRY_CODE, "type": "nominal", "title": "Code" },
                        { "field": metric, "type": "quantitative", "title": metric_title(metric) }
                    ]
                }
            }
        ]
    }))
}
