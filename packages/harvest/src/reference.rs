//! Reference data: known entity lists and the campaign alias map.
//!
//! These are small, hand-maintained files loaded once per run and passed
//! explicitly into the inference functions, never read ambiently. A missing
//! file is treated as "no data", never as an error, so a fresh checkout
//! degrades to pass-through behavior instead of failing.
//!
//! Formats:
//! - `groups.txt`, `systems.txt`: one canonical display name per line,
//!   `#`-prefixed lines and blank lines ignored. Line order is meaningful:
//!   it is the deterministic tie-break order for inference.
//! - `campaign_aliases.txt`: `FROM => TO` per line, case-insensitive on
//!   the FROM side.

use std::collections::HashMap;
use std::io;
use std::path::Path;

/// An ordered set of canonical display names (known groups or known
/// systems). Iteration order is the file's line order.
#[derive(Debug, Clone, Default)]
pub struct NameList {
    names: Vec<String>,
}

impl NameList {
    /// Build a list from explicit names (mainly for tests).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the line-oriented list format.
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self { names }
    }

    /// Load from a file; a missing file yields an empty list.
    pub fn load(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Case-insensitive mapping from a source campaign name to its canonical
/// display form.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    map: HashMap<String, String>,
}

impl AliasMap {
    /// Build a map from explicit pairs (mainly for tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Parse the `FROM => TO` format. Lines without a `=>`, comments and
    /// blanks are skipped; either side empty skips the line.
    pub fn parse(text: &str) -> Self {
        let mut map = HashMap::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((from, to)) = line.split_once("=>") else {
                continue;
            };
            let from = from.trim();
            let to = to.trim();
            if !from.is_empty() && !to.is_empty() {
                map.insert(from.to_lowercase(), to.to_string());
            }
        }
        Self { map }
    }

    /// Load from a file; a missing file yields an empty map.
    pub fn load(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// Look up the canonical form for a name, case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Everything the inference stages need, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub groups: NameList,
    pub systems: NameList,
    pub campaign_aliases: AliasMap,
}

impl ReferenceData {
    /// Load `groups.txt`, `systems.txt` and `campaign_aliases.txt` from a
    /// data directory. Missing files yield empty data.
    pub fn load_from_dir(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            groups: NameList::load(&dir.join("groups.txt"))?,
            systems: NameList::load(&dir.join("systems.txt"))?,
            campaign_aliases: AliasMap::load(&dir.join("campaign_aliases.txt"))?,
        })
    }

    /// Empty reference data (inference will always come back absent).
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_list_skips_comments_and_blanks() {
        let list = NameList::parse("# known groups\nThe Irregulars\n\n  Critical Hit  \n");
        let names: Vec<_> = list.iter().collect();
        assert_eq!(names, vec!["The Irregulars", "Critical Hit"]);
    }

    #[test]
    fn name_list_preserves_line_order() {
        let list = NameList::parse("Zeta\nAlpha\nMu\n");
        let names: Vec<_> = list.iter().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mu"]);
    }

    #[test]
    fn alias_map_is_case_insensitive_on_from() {
        let map = AliasMap::parse("RotRL => Rise of the Runelords\n# comment\nbad line\n");
        assert_eq!(map.resolve("rotrl"), Some("Rise of the Runelords"));
        assert_eq!(map.resolve("ROTRL"), Some("Rise of the Runelords"));
        assert_eq!(map.resolve("unrelated"), None);
    }

    #[test]
    fn missing_files_load_as_empty() {
        let refs = ReferenceData::load_from_dir(Path::new("/nonexistent/data/dir")).unwrap();
        assert!(refs.groups.is_empty());
        assert!(refs.systems.is_empty());
        assert!(refs.campaign_aliases.is_empty());
    }
}
