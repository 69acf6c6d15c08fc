use serde::Deserialize;

use crate::dash::io_common::Locator;
use crate::dash::*;

#[derive(Debug, Deserialize)]
struct CodeEntry {
    code: String,
    id: u32,
    // The names of the countries table are used instead.
    #[allow(dead_code)]
    name: Option<String>,
}

/// Reads the ids of the shapes of the world map, by country code.
pub fn read_country_codes(bytes: &[u8], locator: &Locator) -> DashResult<Vec<CountryCode>> {
    let entries: Vec<CodeEntry> = serde_json::from_slice(bytes).context(ParsingJsonSnafu {
        locator: locator.to_string(),
    })?;
    debug!(
        "read_country_codes: {} codes from {}",
        entries.len(),
        locator.simple_name()
    );
    Ok(entries
        .into_iter()
        .map(|e| CountryCode {
            code: e.code,
            map_id: e.id,
        })
        .collect())
}
