//! Pull options, tuning configuration and the checksum decision table.

use serde::{Deserialize, Serialize};

/// Per-pull behaviour toggles. All default to `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullOptions {
    /// Reject content objects whose permission bits fall outside `0o775`.
    pub bare_user_only_files: bool,
    /// Fetch only the commit objects; the pulled commits are marked partial.
    pub commit_only: bool,
    /// Write refs under `refs/heads/`, and pull every advertised ref when none
    /// are named.
    pub mirror: bool,
    /// Skip checksum verification for objects fetched over HTTP.
    pub trusted_http: bool,
    /// Verify checksums even for objects read from a local repository.
    pub untrusted: bool,
}

/// Where fetched objects come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Http,
    Local,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Http => f.write_str("http"),
            SourceKind::Local => f.write_str("local"),
        }
    }
}

/// Whether fetched objects have their checksum recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumPolicy {
    Verify,
    Skip,
}

impl ChecksumPolicy {
    /// Decide per source type.
    ///
    /// | source | trusted_http | untrusted | result |
    /// |--------|--------------|-----------|--------|
    /// | HTTP   | false        | any       | verify |
    /// | HTTP   | true         | any       | skip   |
    /// | Local  | any          | false     | skip   |
    /// | Local  | any          | true      | verify |
    pub fn for_source(source: SourceKind, options: &PullOptions) -> Self {
        let verify = match source {
            SourceKind::Http => !options.trusted_http,
            SourceKind::Local => options.untrusted,
        };
        if verify {
            ChecksumPolicy::Verify
        } else {
            ChecksumPolicy::Skip
        }
    }
}

/// Retry settings for transient transport failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
        }
    }
}

/// Tuning for the pull engine, read from the `[pull]` config table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Upper bound on object fetches in flight at once.
    pub max_concurrent_fetches: usize,
    pub retry: RetryConfig,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        let cases = [
            (SourceKind::Http, false, false, ChecksumPolicy::Verify),
            (SourceKind::Http, false, true, ChecksumPolicy::Verify),
            (SourceKind::Http, true, false, ChecksumPolicy::Skip),
            (SourceKind::Http, true, true, ChecksumPolicy::Skip),
            (SourceKind::Local, false, false, ChecksumPolicy::Skip),
            (SourceKind::Local, true, false, ChecksumPolicy::Skip),
            (SourceKind::Local, false, true, ChecksumPolicy::Verify),
            (SourceKind::Local, true, true, ChecksumPolicy::Verify),
        ];
        for (source, trusted_http, untrusted, expected) in cases {
            let options = PullOptions {
                trusted_http,
                untrusted,
                ..Default::default()
            };
            assert_eq!(
                ChecksumPolicy::for_source(source, &options),
                expected,
                "{source} trusted_http={trusted_http} untrusted={untrusted}"
            );
        }
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: PullConfig = serde_json::from_str(r#"{"retry": {"max_retries": 5}}"#).unwrap();
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 100);
    }
}
