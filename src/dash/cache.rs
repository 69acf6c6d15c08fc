// On-disk cache of the raw bytes of the sources.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::dash::*;

/// Entries are keyed by the hash of the locator and by a time bucket of
/// `ttl_secs` seconds. Only the entries of the current bucket are served.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FetchCache {
    dir: PathBuf,
    ttl_secs: u64,
}

const EXTENSION: &str = "bin";

impl FetchCache {
    pub fn new<P: AsRef<Path>>(dir: P, ttl_secs: u64) -> FetchCache {
        FetchCache {
            dir: dir.as_ref().to_path_buf(),
            ttl_secs,
        }
    }

    /// The clock of the cache, in seconds.
    pub fn now() -> u64 {
        Utc::now().timestamp().max(0) as u64
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl_secs > 0
    }

    fn key(locator: &str) -> String {
        sha256::digest(locator.to_string())
    }

    fn bucket(&self, now: u64) -> u64 {
        now / self.ttl_secs.max(1)
    }

    fn entry_path(&self, locator: &str, now: u64) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{}",
            FetchCache::key(locator),
            self.bucket(now),
            EXTENSION
        ))
    }

    fn dir_display(&self) -> String {
        self.dir.display().to_string()
    }

    /// The (key, bucket) of a file of the cache directory.
    fn parse_entry_name(name: &str) -> Option<(&str, u64)> {
        let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
        let (key, bucket) = stem.rsplit_once('-')?;
        Some((key, bucket.parse::<u64>().ok()?))
    }

    fn entries(&self) -> DashResult<Vec<(PathBuf, String, u64)>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let read_dir = fs::read_dir(&self.dir).context(CacheDirSnafu {
            path: self.dir_display(),
        })?;
        let mut res = Vec::new();
        for entry_r in read_dir {
            let entry = entry_r.context(CacheDirSnafu {
                path: self.dir_display(),
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some((key, bucket)) = FetchCache::parse_entry_name(&name) {
                res.push((entry.path(), key.to_string(), bucket));
            }
        }
        Ok(res)
    }

    pub fn get(&self, locator: &str, now: u64) -> Option<Vec<u8>> {
        if !self.is_enabled() {
            return None;
        }
        let p = self.entry_path(locator, now);
        match fs::read(&p) {
            Ok(bytes) => {
                debug!("cache: hit for {} ({} bytes)", locator, bytes.len());
                Some(bytes)
            }
            Err(_) => {
                debug!("cache: miss for {}", locator);
                None
            }
        }
    }

    pub fn put(&self, locator: &str, now: u64, bytes: &[u8]) -> DashResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).context(CacheDirSnafu {
            path: self.dir_display(),
        })?;
        let p = self.entry_path(locator, now);
        fs::write(&p, bytes).context(CacheDirSnafu {
            path: p.display().to_string(),
        })?;
        debug!("cache: stored {} bytes for {}", bytes.len(), locator);
        Ok(())
    }

    /// Removes all the entries of a locator. Returns the number of removed files.
    pub fn invalidate(&self, locator: &str) -> DashResult<usize> {
        let key = FetchCache::key(locator);
        let mut num_removed = 0;
        for (p, k, _) in self.entries()? {
            if k == key {
                fs::remove_file(&p).context(CacheDirSnafu {
                    path: p.display().to_string(),
                })?;
                num_removed += 1;
            }
        }
        Ok(num_removed)
    }

    /// Removes the entries of the previous buckets.
    pub fn purge_stale(&self, now: u64) -> DashResult<usize> {
        if !self.is_enabled() {
            return Ok(0);
        }
        let current = self.bucket(now);
        let mut num_removed = 0;
        for (p, _, bucket) in self.entries()? {
            if bucket != current {
                fs::remove_file(&p).context(CacheDirSnafu {
                    path: p.display().to_string(),
                })?;
                num_removed += 1;
            }
        }
        Ok(num_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.org/time_series.csv";

    fn test_cache(name: &str, ttl_secs: u64) -> FetchCache {
        let dir = std::env::temp_dir().join(format!("covidash-cache-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        FetchCache::new(dir, ttl_secs)
    }

    #[test]
    fn served_within_the_bucket() {
        let cache = test_cache("bucket", 100);
        assert_eq!(cache.get(URL, 1_000), None);
        cache.put(URL, 1_000, b"a,b\n1,2\n").unwrap();
        assert_eq!(cache.get(URL, 1_050), Some(b"a,b\n1,2\n".to_vec()));
        // Next bucket: stale.
        assert_eq!(cache.get(URL, 1_100), None);
        assert_eq!(cache.get("https://example.org/other.csv", 1_050), None);
    }

    #[test]
    fn invalidation() {
        let cache = test_cache("invalidate", 100);
        cache.put(URL, 1_000, b"x").unwrap();
        cache.put(URL, 1_200, b"y").unwrap();
        cache.put("other", 1_000, b"z").unwrap();
        assert_eq!(cache.invalidate(URL).unwrap(), 2);
        assert_eq!(cache.get(URL, 1_000), None);
        assert_eq!(cache.get("other", 1_000), Some(b"z".to_vec()));
    }

    #[test]
    fn purge() {
        let cache = test_cache("purge", 100);
        cache.put(URL, 1_000, b"x").unwrap();
        cache.put(URL, 1_200, b"y").unwrap();
        assert_eq!(cache.purge_stale(1_250).unwrap(), 1);
        assert_eq!(cache.get(URL, 1_250), Some(b"y".to_vec()));
    }

    #[test]
    fn disabled_cache() {
        let cache = test_cache("disabled", 0);
        cache.put(URL, 1_000, b"x").unwrap();
        assert_eq!(cache.get(URL, 1_000), None);
        assert_eq!(cache.purge_stale(1_000).unwrap(), 0);
    }

    #[test]
    fn entry_names() {
        assert_eq!(
            FetchCache::parse_entry_name("abc-12.bin"),
            Some(("abc", 12))
        );
        assert_eq!(FetchCache::parse_entry_name("abc.bin"), None);
        assert_eq!(FetchCache::parse_entry_name("abc-12.txt"), None);
    }
}
