use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::ValueEnum;

pub const DEFAULT_DATA_PATH: &str = "./NYC-Airbnb-2023.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            other => bail!("unknown output format: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    /// Overrides the view's own bucketing threshold when set
    pub bucket_threshold: Option<usize>,
    pub format: OutputFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bucket_threshold = lookup("BUCKET_THRESHOLD")
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .context("BUCKET_THRESHOLD must be a non-negative integer")?;

        let format = lookup("OUTPUT_FORMAT")
            .map(|v| v.parse::<OutputFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            data_path: lookup("LISTINGS_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            bucket_threshold,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(cfg.bucket_threshold, None);
        assert_eq!(cfg.format, OutputFormat::Json);
    }

    #[test]
    fn test_env_values() {
        let cfg = Config::from_lookup(lookup(&[
            ("LISTINGS_CSV", "/data/listings.csv"),
            ("BUCKET_THRESHOLD", "25"),
            ("OUTPUT_FORMAT", "Table"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_path, PathBuf::from("/data/listings.csv"));
        assert_eq!(cfg.bucket_threshold, Some(25));
        assert_eq!(cfg.format, OutputFormat::Table);
    }

    #[test]
    fn test_bad_threshold() {
        assert!(Config::from_lookup(lookup(&[("BUCKET_THRESHOLD", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("OUTPUT_FORMAT", "xml")])).is_err());
    }
}
