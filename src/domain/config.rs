use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

/// Connection settings for the model server.
///
/// The server location is always passed explicitly to the clients that need
/// it; there is no process-wide host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Base URL of the SysML v2 REST API, e.g. `http://localhost:9000`.
    host: String,

    /// Upper bound on every request to the server, in seconds.
    ///
    /// An expired request is reported like any other transport failure.
    timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The server base URL, without a trailing slash.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// Replaces the server base URL.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    /// The request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Replaces the request timeout.
    pub const fn set_timeout_secs(&mut self, secs: u64) {
        self.timeout_secs = secs;
    }
}

fn default_host() -> String {
    "http://localhost:9000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_host")]
        host: String,

        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { host, timeout_secs } => Self { host, timeout_secs },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            host: config.host,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nhost = \"http://models.local:9000/\"\ntimeout_secs = 5\n")
            .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.host(), "http://models.local:9000");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ntimeout_secs = \"soon\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sysml.toml");
        let mut config = Config::default();
        config.set_host("http://example.org:9000");
        config.set_timeout_secs(12);

        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
