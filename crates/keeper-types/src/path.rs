use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Globally unique key of a tracked object: `account/container/path`.
///
/// The account and container segments never contain `/`; the object path may
/// (blob stores have flat namespaces with `/` as a conventional separator).
/// Ordering and equality follow the full string form, so ledger listings
/// sorted by canonical path agree with SQL `ORDER BY path`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPath {
    full: String,
    container_at: usize,
    path_at: usize,
}

impl CanonicalPath {
    /// Compose a canonical path from its three parts.
    pub fn new(account: &str, container: &str, path: &str) -> Result<Self, TypeError> {
        let full = format!("{account}/{container}/{path}");
        validate_segment(&full, "account", account)?;
        validate_segment(&full, "container", container)?;
        if path.is_empty() {
            return Err(invalid(&full, "object path is empty"));
        }
        if path.starts_with('/') || path.ends_with('/') {
            return Err(invalid(&full, "object path must not start or end with '/'"));
        }
        Ok(Self {
            container_at: account.len() + 1,
            path_at: account.len() + container.len() + 2,
            full,
        })
    }

    /// Parse `account/container/path`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut parts = s.splitn(3, '/');
        let account = parts.next().unwrap_or_default();
        let (Some(container), Some(path)) = (parts.next(), parts.next()) else {
            return Err(invalid(s, "expected account/container/path"));
        };
        Self::new(account, container, path)
    }

    pub fn account(&self) -> &str {
        &self.full[..self.container_at - 1]
    }

    pub fn container(&self) -> &str {
        &self.full[self.container_at..self.path_at - 1]
    }

    /// Container-relative object path.
    pub fn object_path(&self) -> &str {
        &self.full[self.path_at..]
    }

    /// Last segment of the object path.
    pub fn file_name(&self) -> &str {
        let path = self.object_path();
        path.rsplit('/').next().unwrap_or(path)
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

fn validate_segment(full: &str, what: &str, segment: &str) -> Result<(), TypeError> {
    if segment.is_empty() {
        return Err(invalid(full, &format!("{what} is empty")));
    }
    if segment.contains('/') {
        return Err(invalid(full, &format!("{what} must not contain '/'")));
    }
    if segment.trim() != segment {
        return Err(invalid(full, &format!("{what} has surrounding whitespace")));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> TypeError {
    TypeError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Debug for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalPath({})", self.full)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for CanonicalPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CanonicalPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CanonicalPath> for String {
    fn from(path: CanonicalPath) -> Self {
        path.full
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.full
    }
}
