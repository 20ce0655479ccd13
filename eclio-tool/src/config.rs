//! Optional TOML configuration for the eclio tool
//!
//! ```toml
//! log_level = "debug"
//! endian = "little"
//! name_filter = ["PRESSURE", "SWAT"]
//! lazy = false
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use eclio_engine::{Endian, NameFilter, OpenMode};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: Option<String>,
    pub endian: Option<Endian>,
    pub name_filter: Vec<String>,
    pub lazy: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn open_mode(&self) -> OpenMode {
        OpenMode {
            writable: false,
            endian: self.endian,
            lazy: self.lazy,
        }
    }

    /// `None` when no filter is configured
    pub fn name_filter(&self) -> Result<Option<NameFilter>> {
        if self.name_filter.is_empty() {
            return Ok(None);
        }
        Ok(Some(NameFilter::new(&self.name_filter)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            log_level = "debug"
            endian = "little"
            name_filter = ["PRESSURE", "SWAT"]
            lazy = true
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        let mode = config.open_mode();
        assert_eq!(mode.endian, Some(Endian::Little));
        assert!(mode.lazy);
        assert!(!mode.writable);
        assert_eq!(config.name_filter().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.log_level.is_none());
        assert_eq!(config.open_mode(), OpenMode::read_only());
        assert!(config.name_filter().unwrap().is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::parse("endian = \"middle\"").is_err());
        assert!(Config::parse("unknown = 1").is_err());

        let config = Config::parse("name_filter = [\"WAYTOOLONGNAME\"]").unwrap();
        assert!(config.name_filter().is_err());
    }
}
