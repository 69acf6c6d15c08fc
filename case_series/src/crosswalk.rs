use log::{debug, warn};
use std::collections::HashSet;

use crate::config::*;

/// A substitution table between the country names of the case sources and the
/// ones of the country reference table.
///
/// The table is maintained by hand: it has to follow both vocabularies, or
/// rows silently fall out of the joins. [Crosswalk::audit] reports the drift.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Crosswalk {
    pub version: u32,
    entries: Vec<(String, String)>,
}

/// The result of checking a crosswalk against the names actually seen.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CrosswalkAudit {
    /// Keys of the table that appear in no source row.
    pub stale_keys: Vec<String>,
    /// Source names, after substitution, that the reference does not know.
    pub unmapped: Vec<String>,
}

impl CrosswalkAudit {
    pub fn is_clean(&self) -> bool {
        self.stale_keys.is_empty() && self.unmapped.is_empty()
    }
}

// Version 1: the substitutions needed by the JHU CSSE global time series
// against the countries reference table.
const BUILTIN_VERSION: u32 = 1;
const BUILTIN_ENTRIES: [(&str, &str); 6] = [
    ("Cabo Verde", "Cape Verde"),
    ("Congo (Brazzaville)", "Congo [Republic]"),
    ("Congo (Kinshasa)", "Congo [DRC]"),
    ("Korea, South", "South Korea"),
    ("Taiwan*", "Taiwan"),
    ("US", "United States"),
];

impl Crosswalk {
    /// The built-in table.
    pub fn builtin() -> Crosswalk {
        Crosswalk {
            version: BUILTIN_VERSION,
            entries: BUILTIN_ENTRIES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Builds and validates a table.
    pub fn new(version: u32, entries: Vec<(String, String)>) -> SeriesResult<Crosswalk> {
        let res = Crosswalk { version, entries };
        res.validate()?;
        Ok(res)
    }

    /// Adds entries to the table. The result is validated.
    pub fn extend(self, extra: &[(String, String)]) -> SeriesResult<Crosswalk> {
        let mut entries = self.entries;
        entries.extend(extra.iter().cloned());
        Crosswalk::new(self.version, entries)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Checks that the substitution is usable: no empty names, every name is
    /// substituted at most once, no two names end up the same, and no target
    /// is itself substituted.
    pub fn validate(&self) -> SeriesResult<()> {
        let mut keys: HashSet<&str> = HashSet::new();
        let mut targets: HashSet<&str> = HashSet::new();
        for (from, to) in self.entries.iter() {
            if from.is_empty() || to.is_empty() {
                return Err(SeriesError::InvalidCrosswalk {
                    reason: format!("empty name in {:?} -> {:?}", from, to),
                });
            }
            if !keys.insert(from.as_str()) {
                return Err(SeriesError::InvalidCrosswalk {
                    reason: format!("{:?} is substituted twice", from),
                });
            }
            if !targets.insert(to.as_str()) {
                return Err(SeriesError::InvalidCrosswalk {
                    reason: format!("two names are substituted by {:?}", to),
                });
            }
        }
        if let Some(chained) = targets.iter().find(|t| keys.contains(*t)) {
            return Err(SeriesError::InvalidCrosswalk {
                reason: format!("{:?} is both substituted and a substitution", chained),
            });
        }
        Ok(())
    }

    /// The normalized name.
    pub fn apply<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
            .unwrap_or(name)
    }

    /// Compares the table with the raw names of a source and the names of the
    /// reference table. Every finding is also logged as a warning.
    pub fn audit(&self, raw_names: &[String], reference_names: &[String]) -> CrosswalkAudit {
        let raw: HashSet<&str> = raw_names.iter().map(|s| s.as_str()).collect();
        let reference: HashSet<&str> = reference_names.iter().map(|s| s.as_str()).collect();

        let stale_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(from, _)| !raw.contains(from.as_str()))
            .map(|(from, _)| from.clone())
            .collect();

        let mut unmapped: Vec<String> = Vec::new();
        for name in raw_names.iter() {
            let normalized = self.apply(name);
            if !reference.contains(normalized) && !unmapped.iter().any(|s| s == normalized) {
                unmapped.push(normalized.to_string());
            }
        }

        for key in stale_keys.iter() {
            warn!(
                "crosswalk v{}: substitution for {:?} matches no source name",
                self.version, key
            );
        }
        for name in unmapped.iter() {
            warn!(
                "crosswalk v{}: {:?} is not in the reference table",
                self.version, name
            );
        }
        debug!(
            "audit: {} raw names, {} stale keys, {} unmapped",
            raw_names.len(),
            stale_keys.len(),
            unmapped.len()
        );
        CrosswalkAudit {
            stale_keys,
            unmapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Country/Region names of a JHU CSSE global time series snapshot.
    const JHU_SNAPSHOT: &str = include_str!("fixtures/jhu_country_names.txt");

    fn snapshot_names() -> Vec<String> {
        JHU_SNAPSHOT
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn builtin_is_valid() {
        assert_eq!(Crosswalk::builtin().validate(), Ok(()));
    }

    #[test]
    fn builtin_keys_appear_in_the_source() {
        let names = snapshot_names();
        for (from, _) in Crosswalk::builtin().entries() {
            assert!(names.contains(from), "{:?} not in the snapshot", from);
        }
    }

    #[test]
    fn korea_is_normalized() {
        let cw = Crosswalk::builtin();
        assert_eq!(cw.apply("Korea, South"), "South Korea");
        assert_eq!(cw.apply("Chile"), "Chile");
    }

    #[test]
    fn rejects_non_injective_tables() {
        let res = Crosswalk::new(
            2,
            vec![
                ("US".to_string(), "United States".to_string()),
                ("USA".to_string(), "United States".to_string()),
            ],
        );
        assert!(matches!(res, Err(SeriesError::InvalidCrosswalk { .. })));
    }

    #[test]
    fn rejects_chained_substitutions() {
        let res = Crosswalk::builtin().extend(&[("Cape Verde".to_string(), "Cabo".to_string())]);
        assert!(matches!(res, Err(SeriesError::InvalidCrosswalk { .. })));
    }

    #[test]
    fn audit_reports_drift() {
        let cw = Crosswalk::builtin();
        let raw = vec![
            "Korea, South".to_string(),
            "Chile".to_string(),
            "Diamond Princess".to_string(),
        ];
        let reference = vec!["South Korea".to_string(), "Chile".to_string()];
        let audit = cw.audit(&raw, &reference);
        assert_eq!(audit.unmapped, vec!["Diamond Princess".to_string()]);
        assert_eq!(audit.stale_keys.len(), 5);
        assert!(!audit.stale_keys.contains(&"Korea, South".to_string()));
        assert!(!audit.is_clean());
    }
}
