//! Repository configuration, stored as `<repo>/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_pull::PullConfig;

use crate::error::{SdkError, SdkResult};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub pull: PullConfig,
    pub remotes: BTreeMap<String, RemoteConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// `http(s)://…`, `file://…` or a bare filesystem path.
    pub url: String,
}

impl RepoConfig {
    /// Load `config.toml` from the repository root. A missing file yields the
    /// defaults.
    pub fn load(root: &Path) -> SdkResult<Self> {
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| SdkError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace `config.toml`.
    pub fn save(&self, root: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(root)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(root.join(CONFIG_FILE))
            .map_err(|e| SdkError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_layout() {
        let text = r#"
            [pull]
            max_concurrent_fetches = 4

            [pull.retry]
            max_retries = 5
            base_delay_ms = 50
            max_delay_ms = 1000

            [remotes.origin]
            url = "http://127.0.0.1:9418"
        "#;
        let config: RepoConfig = toml::from_str(text).unwrap();
        assert_eq!(config.pull.max_concurrent_fetches, 4);
        assert_eq!(config.pull.retry.max_retries, 5);
        assert_eq!(config.remotes["origin"].url, "http://127.0.0.1:9418");
    }

    #[test]
    fn missing_file_gives_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RepoConfig::load(dir.path()).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.pull.max_concurrent_fetches, 8);

        config.remotes.insert(
            "mirror".into(),
            RemoteConfig {
                url: "/srv/mirror".into(),
            },
        );
        config.save(dir.path()).unwrap();
        assert_eq!(RepoConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[pull\n").unwrap();
        assert!(matches!(RepoConfig::load(dir.path()), Err(SdkError::Config(_))));
    }
}
