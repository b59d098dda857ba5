//! Ignore list: IRC nicks whose chat is never relayed.
//!
//! One nick per line, `#` starts a comment line. The file is read in full on
//! every reload and replaces the previous list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

const HEADER: &str = "\
# Ignore list - Any nicks placed into this file will be ignored in IRC.
# It is not automatically updated. When reloading, all ignored nicks
# are replaced with the nicks in this file.

# One nick per line.
";

#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    nicks: HashSet<String>,
}

impl IgnoreList {
    pub fn parse(text: &str) -> Self {
        let nicks = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { nicks }
    }

    /// Read the list at `path`, writing an empty commented file first if it
    /// does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
            }
            fs::write(path, HEADER).map_err(|e| ConfigError::io(path, e))?;
        }
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.nicks.contains(&nick.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let list = IgnoreList::parse("# comment\n\nSpamBot\n  other  \n#NotIgnored\n");
        assert_eq!(list.nicks.len(), 2);
        assert!(list.contains("spambot"));
        assert!(list.contains("OTHER"));
        assert!(!list.contains("NotIgnored"));
    }

    #[test]
    fn test_load_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ignorelist.txt");
        let list = IgnoreList::load_or_create(&path).unwrap();
        assert!(list.nicks.is_empty());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Ignore list"));
    }

    #[test]
    fn test_reload_replaces_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignorelist.txt");
        fs::write(&path, "alice\nbob\n").unwrap();
        let first = IgnoreList::load_or_create(&path).unwrap();
        assert!(first.contains("alice"));

        fs::write(&path, "carol\n").unwrap();
        let second = IgnoreList::load_or_create(&path).unwrap();
        assert!(!second.contains("alice"));
        assert!(second.contains("carol"));
    }
}
