// Primitives for fetching the sources.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::dash::cache::FetchCache;
use crate::dash::*;

/// Where a source lives.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Locator {
    Url(String),
    Path(PathBuf),
}

impl Locator {
    pub fn parse(s: &str) -> Locator {
        if s.starts_with("http://") || s.starts_with("https://") {
            Locator::Url(s.to_string())
        } else {
            Locator::Path(PathBuf::from(s))
        }
    }

    /// A short name for the logs.
    pub fn simple_name(&self) -> String {
        match self {
            Locator::Url(u) => {
                let no_query = u.split('?').next().unwrap_or(u);
                no_query
                    .rsplit('/')
                    .find(|s| !s.is_empty())
                    .unwrap_or(no_query)
                    .to_string()
            }
            Locator::Path(p) => Path::new(p)
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Url(u) => write!(f, "{}", u),
            Locator::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

pub struct SourceReader {
    client: Client,
    cache: Option<FetchCache>,
    // The cached copies are dropped before fetching.
    refresh: bool,
}

impl SourceReader {
    pub fn new(cache: Option<FetchCache>) -> SourceReader {
        SourceReader {
            client: Client::new(),
            cache,
            refresh: false,
        }
    }

    pub fn refreshing(mut self) -> SourceReader {
        self.refresh = true;
        self
    }

    /// The raw bytes of a source. Only the URLs go through the cache.
    pub fn fetch(&self, locator: &Locator) -> DashResult<Vec<u8>> {
        match locator {
            Locator::Path(p) => {
                debug!("fetch: reading {}", p.display());
                fs::read(p).context(ReadSourceSnafu {
                    path: p.display().to_string(),
                })
            }
            Locator::Url(url) => {
                let now = FetchCache::now();
                if let (true, Some(cache)) = (self.refresh, &self.cache) {
                    let num_removed = cache.invalidate(url)?;
                    debug!("fetch: dropped {} cached copies of {}", num_removed, url);
                }
                if let Some(bytes) = self.cache.as_ref().and_then(|c| c.get(url, now)) {
                    info!("fetch: {} served from the cache", locator.simple_name());
                    return Ok(bytes);
                }
                let bytes = self.download(url)?;
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(url, now, &bytes) {
                        warn!("fetch: could not cache {}: {}", url, e);
                    }
                }
                Ok(bytes)
            }
        }
    }

    fn download(&self, url: &str) -> DashResult<Vec<u8>> {
        info!("download: fetching {}", url);
        let response = self.client.get(url).send().context(FetchSnafu { url })?;
        let status = response.status();
        if !status.is_success() {
            return FetchStatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }
        let bytes = response.bytes().context(FetchSnafu { url })?;
        debug!("download: {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators() {
        let national = Locator::parse(
            "https://github.com/rubens36/covid19/blob/master/data/Infectados%20Covid%20Chile.xlsx?raw=true",
        );
        assert!(matches!(national, Locator::Url(_)));
        assert_eq!(national.simple_name(), "Infectados%20Covid%20Chile.xlsx");

        let local = Locator::parse("data/countries.csv");
        assert_eq!(local, Locator::Path(PathBuf::from("data/countries.csv")));
        assert_eq!(local.simple_name(), "countries.csv");
        assert_eq!(local.to_string(), "data/countries.csv");
    }

    // Nothing listens on the discard port, so a download fails right away.
    const OFFLINE_URL: &str = "http://127.0.0.1:9/time_series_covid19_confirmed_global.csv";
    const TTL: u64 = 1_000_000;

    fn cache_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("covidash-fetch-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn urls_are_served_from_the_cache() {
        let dir = cache_dir("served");
        let seeded = FetchCache::new(&dir, TTL);
        seeded.put(OFFLINE_URL, FetchCache::now(), b"a,b\n1,2\n").unwrap();

        let reader = SourceReader::new(Some(FetchCache::new(&dir, TTL)));
        let bytes = reader.fetch(&Locator::parse(OFFLINE_URL)).unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n".to_vec());
    }

    #[test]
    fn refreshing_drops_the_cached_copy() {
        let dir = cache_dir("refresh");
        let seeded = FetchCache::new(&dir, TTL);
        seeded.put(OFFLINE_URL, FetchCache::now(), b"stale").unwrap();

        let reader = SourceReader::new(Some(FetchCache::new(&dir, TTL))).refreshing();
        let res = reader.fetch(&Locator::parse(OFFLINE_URL));
        match res {
            Err(e) => assert!(e.is_data_unavailable()),
            Ok(_) => panic!("expected the download to fail"),
        }
        assert_eq!(seeded.get(OFFLINE_URL, FetchCache::now()), None);
    }

    #[test]
    fn missing_file() {
        let reader = SourceReader::new(None);
        let res = reader.fetch(&Locator::parse("/nonexistent/covidash/source.csv"));
        match res {
            Err(e) => assert!(e.is_data_unavailable()),
            Ok(_) => panic!("expected an error"),
        }
    }
}
