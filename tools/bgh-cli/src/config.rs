//! Config file handling
//!
//! ```toml
//! host = "192.168.1.50"
//! policy = "broadcast"        # or "polling"
//! listen_port = 20911
//! broadcast_timeout_ms = 15000
//! ```

use anyhow::{bail, Context, Result};
use bgh_client::config::{
    DEFAULT_BROADCAST_TIMEOUT, DEFAULT_FALLBACK_SETTLE, DEFAULT_POLL_INTERVAL,
};
use bgh_client::{AcquisitionPolicy, BghClientBuilder};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Broadcast,
    Polling,
}

/// Settings read from the config file. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub policy: Option<PolicyKind>,
    pub command_port: Option<u16>,
    pub listen_port: Option<u16>,
    pub source_port: Option<u16>,
    pub broadcast_timeout_ms: Option<u64>,
    pub fallback_settle_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub reply_timeout_ms: Option<u64>,
    pub command_settle_ms: Option<u64>,
    pub identity_grace_ms: Option<u64>,
}

/// Values given on the command line; these win over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub policy: Option<PolicyKind>,
    pub command_port: Option<u16>,
    pub listen_port: Option<u16>,
    pub source_port: Option<u16>,
}

/// Default config file location
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bgh")
        .join("config.toml")
}

/// Load the config file.
///
/// An explicitly named file must exist; the default one is optional.
pub fn load(path: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_file(), false),
    };

    if !path.exists() {
        if required {
            bail!("config file {} not found", path.display());
        }
        return Ok(FileConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(text: &str) -> Result<FileConfig> {
    Ok(toml::from_str(text)?)
}

impl FileConfig {
    /// Merge with command-line overrides into a client builder
    pub fn builder(&self, overrides: &Overrides) -> Result<BghClientBuilder> {
        let Some(host) = overrides.host.as_ref().or(self.host.as_ref()) else {
            bail!("no host given: pass --host, set BGH_HOST, or add `host` to the config file");
        };
        let host: IpAddr = host
            .trim()
            .parse()
            .with_context(|| format!("host must be an IP address, got {:?}", host))?;

        let mut builder = BghClientBuilder::new(host).policy(self.policy(overrides.policy));

        if let Some(port) = overrides.command_port.or(self.command_port) {
            builder = builder.command_port(port);
        }
        if let Some(port) = overrides.listen_port.or(self.listen_port) {
            builder = builder.listen_port(port);
        }
        if let Some(port) = overrides.source_port.or(self.source_port) {
            builder = builder.source_port(port);
        }
        if let Some(ms) = self.reply_timeout_ms {
            builder = builder.reply_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.command_settle_ms {
            builder = builder.command_settle(Duration::from_millis(ms));
        }
        if let Some(ms) = self.identity_grace_ms {
            builder = builder.identity_grace(Duration::from_millis(ms));
        }

        Ok(builder)
    }

    fn policy(&self, kind: Option<PolicyKind>) -> AcquisitionPolicy {
        match kind.or(self.policy).unwrap_or(PolicyKind::Broadcast) {
            PolicyKind::Broadcast => AcquisitionPolicy::BroadcastWithFallback {
                broadcast_timeout: self
                    .broadcast_timeout_ms
                    .map_or(DEFAULT_BROADCAST_TIMEOUT, Duration::from_millis),
                fallback_settle: self
                    .fallback_settle_ms
                    .map_or(DEFAULT_FALLBACK_SETTLE, Duration::from_millis),
            },
            PolicyKind::Polling => AcquisitionPolicy::Polling {
                interval: self
                    .poll_interval_ms
                    .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = parse(
            r#"
            host = "192.168.1.50"
            policy = "polling"
            listen_port = 21000
            poll_interval_ms = 30000
            reply_timeout_ms = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(config.policy, Some(PolicyKind::Polling));

        let client = config.builder(&Overrides::default()).unwrap().build();
        let client_config = client.config();
        assert_eq!(client_config.listen_port, 21000);
        assert_eq!(client_config.command_port, 20910);
        assert_eq!(client_config.reply_timeout, Duration::from_secs(2));
        assert_eq!(
            client_config.policy,
            AcquisitionPolicy::Polling {
                interval: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn test_overrides_win() {
        let config = parse("host = \"10.0.0.1\"\nlisten_port = 21000\npolicy = \"polling\"").unwrap();
        let overrides = Overrides {
            host: Some("10.0.0.2".to_string()),
            listen_port: Some(22000),
            policy: Some(PolicyKind::Broadcast),
            ..Default::default()
        };

        let client = config.builder(&overrides).unwrap().build();
        assert_eq!(client.config().host.to_string(), "10.0.0.2");
        assert_eq!(client.config().listen_port, 22000);
        assert_eq!(client.config().policy, AcquisitionPolicy::broadcast());
    }

    #[test]
    fn test_broadcast_timings() {
        let config = parse("host = \"10.0.0.1\"\nbroadcast_timeout_ms = 5000").unwrap();
        let client = config.builder(&Overrides::default()).unwrap().build();
        assert_eq!(
            client.config().policy,
            AcquisitionPolicy::BroadcastWithFallback {
                broadcast_timeout: Duration::from_secs(5),
                fallback_settle: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn test_missing_host() {
        assert!(FileConfig::default().builder(&Overrides::default()).is_err());
    }

    #[test]
    fn test_bad_host_and_unknown_keys() {
        let config = parse("host = \"ac.local\"").unwrap();
        assert!(config.builder(&Overrides::default()).is_err());
        assert!(parse("hots = \"10.0.0.1\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file() {
        assert!(load(Some(Path::new("/nonexistent/bgh.toml"))).is_err());
    }
}
