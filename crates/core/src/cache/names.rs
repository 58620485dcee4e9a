//! Cache-set naming by purpose and deployment version.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a cache set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Bootstrap assets seeded from the manifest at install.
    Shell,
    /// Generic assets and documents fetched while serving.
    Runtime,
    /// Large resources cached lazily on first successful fetch.
    OnDemand,
}

impl Purpose {
    pub const ALL: [Purpose; 3] = [Purpose::Shell, Purpose::Runtime, Purpose::OnDemand];

    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Shell => "shell",
            Purpose::Runtime => "runtime",
            Purpose::OnDemand => "ondemand",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cache-set names recognized for one deployment version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    prefix: String,
    version: String,
    shell: String,
    runtime: String,
    on_demand: String,
}

impl CacheNames {
    pub fn for_version(prefix: &str, version: &str) -> Self {
        let name = |purpose: Purpose| format!("{prefix}-{purpose}-{version}");
        Self {
            prefix: prefix.to_string(),
            version: version.to_string(),
            shell: name(Purpose::Shell),
            runtime: name(Purpose::Runtime),
            on_demand: name(Purpose::OnDemand),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self, purpose: Purpose) -> &str {
        match purpose {
            Purpose::Shell => &self.shell,
            Purpose::Runtime => &self.runtime,
            Purpose::OnDemand => &self.on_demand,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn on_demand(&self) -> &str {
        &self.on_demand
    }

    /// All current names, shell first.
    pub fn all(&self) -> [&str; 3] {
        [&self.shell, &self.runtime, &self.on_demand]
    }

    /// Whether `name` is one of this version's cache sets.
    pub fn is_current(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_format() {
        let names = CacheNames::for_version("tribo", "v5");
        assert_eq!(names.shell(), "tribo-shell-v5");
        assert_eq!(names.runtime(), "tribo-runtime-v5");
        assert_eq!(names.on_demand(), "tribo-ondemand-v5");
        assert_eq!(names.name(Purpose::OnDemand), names.on_demand());
    }

    #[test]
    fn test_is_current() {
        let names = CacheNames::for_version("tribo", "v5");
        assert!(names.is_current("tribo-shell-v5"));
        assert!(!names.is_current("tribo-shell-v4"));
        assert!(!names.is_current("unrelated"));
    }

    #[test]
    fn test_versions_never_share_names() {
        let v1 = CacheNames::for_version("app", "v1");
        let v2 = CacheNames::for_version("app", "v2");
        for name in v1.all() {
            assert!(!v2.is_current(name));
        }
    }
}
