/*!

This is the long-form manual for `case_series` and `covidash`.

## Input formats

The following sources are supported:
* the national spreadsheet (Excel `.xlsx`), one sheet
* the international time series (CSV), one file per metric
* the countries table (CSV, `;`-delimited, Latin-1)
* the country codes of the world map (JSON)

Every source is given either as a URL (`http://` or `https://`) or as a path
on the local disk.

### National spreadsheet

One row per region, one column per date. The columns that are not dates
identify the region. The dates are either spreadsheet date cells or labels
formatted as `DD-MM-YYYY`:

|  region_title | region | id | 03-03-2020 | 04-03-2020 | ... |
|---------------|--------|----|------------|------------|-----|
| Metropolitana | RM     | 13 | 1          | 1          |     |
| Maule         | VII    | 7  | 0          | 1          |     |
| ...           |        |    |            |            |     |

The values are cumulative counts. An empty cell is a missing value: its daily
count is missing too, and the next daily count covers the gap.

The name in `region_title` is used to find the population of the region. It
must match one of the 16 names of [crate::chilean_regions]. Regions that do
not match are kept, with a missing population, and are listed in the report.

The `id` column is used to find the shape of the region in the map of the
regions (the `properties.id` field of the GeoJSON features).

### International time series

The global time series of the Johns Hopkins CSSE repository:

```text
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
,Chile,-35.6751,-71.543,0,0
Ontario,Canada,51.2538,-85.3232,0,0
```

The dates are formatted as `M/D/YY`. They are ordered chronologically,
whatever their order in the file. The columns `Province/State`, `Lat` and
`Long` are dropped, and the rows of the same country are summed.

### Countries table

```text
code;lat;lon;name
CL;-35.675147;-71.542969;Chile
```

### Country codes

```text
[{"code": "CL", "id": 152, "name": "Chile"}]
```

The `id` is the id of the shape of the country in the world map. The `name`
field is not used: the names of the countries table are authoritative.

## Country names

The country names of the time series and of the countries table do not always
agree. A substitution table, the crosswalk, translates the names of the time
series before joining them. The built-in table (version 1) is:

| time series         | countries table  |
|---------------------|------------------|
| Cabo Verde          | Cape Verde       |
| Congo (Brazzaville) | Congo [Republic] |
| Congo (Kinshasa)    | Congo [DRC]      |
| Korea, South        | South Korea      |
| Taiwan*             | Taiwan           |
| US                  | United States    |

More entries can be added in the configuration file. The table is checked
before use: a name cannot be translated twice, two names cannot be translated
into the same one, and a translated name cannot itself be translated.

Countries that are still not found in the countries table are dropped from the
map of the countries and listed in the report.

## Configuration

`covidash` comes with defaults pointing to the public sources. A configuration
file in JSON can override them. All the fields are optional:

```text
{
  "nationalSource": "data/Infectados Covid Chile.xlsx",
  "nationalSheet": "original",
  "confirmedSource": "https://...",
  "deathsSource": "https://...",
  "recoveredSource": "https://...",
  "countriesSource": "https://...",
  "countryCodesSource": "https://...",
  "regionsGeojson": "https://...",
  "worldTopojson": "https://...",
  "defaultCountries": ["Chile", "Peru"],
  "negativeDeltas": "clamp",
  "crosswalk": [["Burma", "Myanmar"]],
  "cacheDir": ".covidash-cache",
  "cacheTtlSeconds": 3600
}
```

The options given on the command line take precedence over the configuration
file.

Negative daily counts happen when a source corrects a cumulative count
downwards. They are kept by default (`pass-through`), or replaced by zero
(`clamp`). They are counted in the logs in both cases.

 */
