//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Build metadata captured at compile time."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::fmt;

use serde::Serialize;

const UNKNOWN: &str = "unknown";

/// What `vergen` recorded about this build. Fields it could not determine
/// (no git checkout, for instance) read `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub semver: &'static str,
    pub git_sha: &'static str,
    pub built_at: &'static str,
    pub target: &'static str,
    pub opt_level: &'static str,
}

const fn recorded(value: Option<&'static str>) -> &'static str {
    match value {
        Some(value) => value,
        None => UNKNOWN,
    }
}

impl VersionInfo {
    pub const fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION"),
            git_sha: recorded(option_env!("VERGEN_GIT_SHA")),
            built_at: recorded(option_env!("VERGEN_BUILD_TIMESTAMP")),
            target: recorded(option_env!("VERGEN_CARGO_TARGET_TRIPLE")),
            opt_level: recorded(option_env!("VERGEN_CARGO_OPT_LEVEL")),
        }
    }

    /// Abbreviated commit, at most 10 characters.
    pub fn short_sha(&self) -> &'static str {
        self.git_sha.get(..10).unwrap_or(self.git_sha)
    }

    /// One-line form for startup logs.
    pub fn banner(&self) -> String {
        self.to_string()
    }

    /// Multi-line form printed by `--version` and `netpulsed version`.
    pub fn extended(&self) -> String {
        format!(
            "{self}\ncommit:    {}\nbuilt:     {}\ntarget:    {}\nopt-level: {}",
            self.git_sha, self.built_at, self.target, self.opt_level
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "netpulsed {} ({})", self.semver, self.short_sha())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_package_version_and_commit() {
        let info = VersionInfo::current();
        assert!(info.banner().starts_with("netpulsed "));
        assert!(info.banner().contains(env!("CARGO_PKG_VERSION")));
        assert!(info.short_sha().len() <= 10);
        assert!(info.extended().lines().any(|line| line.starts_with("target:")));
    }

    #[test]
    fn missing_values_read_unknown() {
        assert_eq!(recorded(None), "unknown");
        let info = VersionInfo {
            git_sha: UNKNOWN,
            ..VersionInfo::current()
        };
        assert_eq!(info.short_sha(), "unknown");
        assert_eq!(
            VersionInfo {
                git_sha: "0123456789abcdef",
                ..info
            }
            .short_sha(),
            "0123456789"
        );
    }
}
