use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use keeper_types::CanonicalPath;

use crate::error::{SourceError, SourceResult};

/// Container wildcard: scan every container of the account.
pub const ALL_CONTAINERS: &str = "*";

fn default_patterns() -> Vec<String> {
    vec!["*.yaml".into(), "*.yml".into()]
}

/// Scope as written in configuration (`[[scopes]]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub account: String,
    /// Empty, or containing `"*"`, means every container of the account.
    #[serde(default)]
    pub containers: Vec<String>,
    /// Container-relative path prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Globs matched against the object's base name. Empty matches everything.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

impl ScopeConfig {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            containers: Vec::new(),
            prefix: None,
            patterns: default_patterns(),
        }
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.containers.push(container.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// A validated region of the remote store the scanner is responsible for.
#[derive(Clone, Debug)]
pub struct StorageScope {
    config: ScopeConfig,
    globs: GlobSet,
}

impl StorageScope {
    pub fn new(config: ScopeConfig) -> SourceResult<Self> {
        check_segment("account", &config.account)?;
        for container in &config.containers {
            if container != ALL_CONTAINERS {
                check_segment("container", container)?;
            }
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.patterns {
            let glob = Glob::new(pattern).map_err(|e| SourceError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| SourceError::InvalidPattern {
            pattern: config.patterns.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self { config, globs })
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub fn account(&self) -> &str {
        &self.config.account
    }

    /// `None` when the scope covers every container of the account.
    pub fn containers(&self) -> Option<&[String]> {
        if self.is_wildcard() {
            None
        } else {
            Some(&self.config.containers)
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.config.containers.is_empty()
            || self.config.containers.iter().any(|c| c == ALL_CONTAINERS)
    }

    pub fn prefix(&self) -> &str {
        self.config.prefix.as_deref().unwrap_or("")
    }

    pub fn covers_container(&self, container: &str) -> bool {
        self.containers()
            .map_or(true, |list| list.iter().any(|c| c == container))
    }

    /// Prefix and filename-glob check on a container-relative object path.
    pub fn matches_object(&self, object_path: &str) -> bool {
        if !object_path.starts_with(self.prefix()) {
            return false;
        }
        if self.config.patterns.is_empty() {
            return true;
        }
        let name = object_path.rsplit('/').next().unwrap_or(object_path);
        self.globs.is_match(name)
    }

    /// Whether a listing of this scope would include `path`.
    pub fn covers(&self, path: &CanonicalPath) -> bool {
        path.account() == self.account()
            && self.covers_container(path.container())
            && self.matches_object(path.object_path())
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.account())?;
        match self.containers() {
            None => f.write_str(ALL_CONTAINERS)?,
            Some([one]) => f.write_str(one)?,
            Some(list) => write!(f, "{{{}}}", list.join(","))?,
        }
        if !self.prefix().is_empty() {
            write!(f, "/{}", self.prefix())?;
        }
        Ok(())
    }
}

fn check_segment(what: &str, value: &str) -> SourceResult<()> {
    if value.is_empty() {
        return Err(SourceError::InvalidScope(format!("{what} must not be empty")));
    }
    if value.contains('/') {
        return Err(SourceError::InvalidScope(format!(
            "{what} {value:?} must not contain '/'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> CanonicalPath {
        CanonicalPath::parse(s).unwrap()
    }

    #[test]
    fn default_patterns_match_yaml_base_names() {
        let scope = StorageScope::new(ScopeConfig::new("acct").container("config")).unwrap();
        assert!(scope.covers(&path("acct/config/a.yaml")));
        assert!(scope.covers(&path("acct/config/deep/nested/b.yml")));
        assert!(!scope.covers(&path("acct/config/readme.md")));
        assert!(!scope.covers(&path("acct/other/a.yaml")));
        assert!(!scope.covers(&path("other/config/a.yaml")));
    }

    #[test]
    fn globs_apply_to_base_name_only() {
        let scope = StorageScope::new(
            ScopeConfig::new("acct").patterns(["flags-*.json"]),
        )
        .unwrap();
        assert!(scope.matches_object("env/prod/flags-main.json"));
        assert!(!scope.matches_object("flags-dir/main.json"));
    }

    #[test]
    fn prefix_filters_container_relative_path() {
        let scope = StorageScope::new(ScopeConfig::new("acct").prefix("prod/")).unwrap();
        assert!(scope.matches_object("prod/a.yaml"));
        assert!(!scope.matches_object("dev/a.yaml"));
    }

    #[test]
    fn empty_pattern_list_matches_everything() {
        let scope = StorageScope::new(ScopeConfig::new("acct").patterns(Vec::<String>::new())).unwrap();
        assert!(scope.matches_object("anything.bin"));
    }

    #[test]
    fn wildcard_forms() {
        let empty = StorageScope::new(ScopeConfig::new("acct")).unwrap();
        let star = StorageScope::new(ScopeConfig::new("acct").container("*")).unwrap();
        for scope in [&empty, &star] {
            assert!(scope.is_wildcard());
            assert!(scope.containers().is_none());
            assert!(scope.covers_container("anything"));
        }
        assert_eq!(star.to_string(), "acct/*");
    }

    #[test]
    fn display_lists_containers_and_prefix() {
        let scope = StorageScope::new(
            ScopeConfig::new("acct").container("a").container("b").prefix("cfg"),
        )
        .unwrap();
        assert_eq!(scope.to_string(), "acct/{a,b}/cfg");
    }

    #[test]
    fn invalid_scopes_are_rejected() {
        assert!(matches!(
            StorageScope::new(ScopeConfig::new("")),
            Err(SourceError::InvalidScope(_))
        ));
        assert!(matches!(
            StorageScope::new(ScopeConfig::new("acct").container("a/b")),
            Err(SourceError::InvalidScope(_))
        ));
        assert!(matches!(
            StorageScope::new(ScopeConfig::new("acct").patterns(["[unclosed"])),
            Err(SourceError::InvalidPattern { .. })
        ));
    }
}
