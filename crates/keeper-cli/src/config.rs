//! `keeper.toml` loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer};

use keeper_scan::ScanConfig;
use keeper_server::ServerConfig;
use keeper_source::{ScopeConfig, StorageScope};

/// Where objects are read from and restored to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SourceConfig {
    /// Directory tree laid out as `<root>/<account>/<container>/<path>`.
    Local { root: PathBuf },
}

/// `[scan]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    #[serde(deserialize_with = "humane_duration")]
    pub interval: Duration,
    pub scope_concurrency: usize,
    pub fetch_concurrency: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        let defaults = ScanConfig::default();
        Self {
            interval: defaults.interval,
            scope_concurrency: defaults.scope_concurrency,
            fetch_concurrency: defaults.fetch_concurrency,
        }
    }
}

impl From<&ScanSection> for ScanConfig {
    fn from(section: &ScanSection) -> Self {
        Self {
            interval: section.interval,
            scope_concurrency: section.scope_concurrency,
            fetch_concurrency: section.fetch_concurrency,
        }
    }
}

/// `[database]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./keeper.db"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Read, expand `${VAR}` references, parse, and validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(&expand_env(raw)).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scopes.is_empty() {
            bail!("at least one [[scopes]] entry is required");
        }
        self.storage_scopes()?;
        ScanConfig::from(&self.scan).validate()?;
        Ok(())
    }

    pub fn storage_scopes(&self) -> anyhow::Result<Vec<StorageScope>> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, scope)| {
                StorageScope::new(scope.clone()).with_context(|| format!("scopes[{i}]"))
            })
            .collect()
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::from(&self.scan)
    }
}

/// Parse `250ms`, `30s`, `5m`, `1h`, or a combination such as `1m30s`.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            bail!("invalid duration {s:?}: expected a number");
        }
        let value: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("invalid duration {s:?}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "" => bail!("invalid duration {s:?}: missing unit (ms, s, m, h)"),
            other => bail!("invalid duration {s:?}: unknown unit {other:?}"),
        };
        total = match part.and_then(|part| total.checked_add(part)) {
            Some(total) => total,
            None => bail!("invalid duration {s:?}: too large"),
        };
        rest = &rest[unit_len..];
    }
    Ok(total)
}

fn humane_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

/// Replace `${NAME}` with the value of environment variable `NAME`, or
/// nothing when it is unset.
fn expand_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&std::env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
