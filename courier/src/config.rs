//! Engine configuration, loaded from a RON file.

use std::path::{Path, PathBuf};

use courier_common::{
    audit::AuditConfig,
    campaign::Campaign,
    catalog::{Order, Product},
    job::BulkJob,
    provider::Provider,
    quota::QuotaLimits,
    subscriber::Subscriber,
};
use courier_delivery::DispatcherConfig;
use courier_transport::TransportConfig;
use serde::Deserialize;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Global hourly/daily send ceilings. Both must be set for any
    /// admission to be granted.
    #[serde(default)]
    pub quota: QuotaLimits,

    /// Transport providers, tried in ascending priority order.
    #[serde(default)]
    pub providers: Vec<Provider>,

    /// Shared transport adapter settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Dispatcher tuning (sender address, pacing).
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Path of the control socket.
    #[serde(default = "default_control_socket")]
    pub control_socket: String,

    /// Internal scheduler interval. `None` means the engine only acts on
    /// external triggers.
    #[serde(default)]
    pub tick_interval_secs: Option<u64>,

    /// Audit event configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Optional fixture file loaded into the store at startup (staging and
    /// demos; production stores are seeded externally).
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
}

fn default_control_socket() -> String {
    courier_control::DEFAULT_CONTROL_SOCKET.to_string()
}

impl Config {
    /// Load configuration from a RON file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
        })?;
        Ok(ron::from_str(&content)?)
    }
}

/// Find the configuration file using the following precedence:
/// 1. `COURIER_CONFIG` environment variable
/// 2. `./courier.config.ron` (current working directory)
/// 3. `/etc/courier/courier.config.ron` (system-wide config)
///
/// # Errors
/// Returns an error when no configuration file exists at any location.
pub fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var("COURIER_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "COURIER_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./courier.config.ron"),
        PathBuf::from("/etc/courier/courier.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - COURIER_CONFIG environment variable\n{paths_tried}"
    )
}

/// Fixture data inserted into the store at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
    #[serde(default)]
    pub suppression: Vec<String>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub jobs: Vec<BulkJob>,
    #[serde(default)]
    pub payloads: Vec<PayloadFixture>,
}

/// A bulk-job payload to place in the payload store.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadFixture {
    /// Reference jobs use to find the payload.
    pub reference: String,
    /// File to read the payload bytes from.
    pub file: PathBuf,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use courier_common::provider::{ProviderCredentials, RelayTls};

    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: Config = ron::from_str(
            r#"(
                quota: (
                    hourly: Some(200),
                    daily: Some(2000),
                ),
                providers: [
                    (
                        name: "primary-api",
                        priority: 10,
                        credentials: http_api(
                            endpoint: "https://api.mail.example/v1/send",
                            api_key: "key",
                        ),
                    ),
                    (
                        name: "backup-relay",
                        priority: 20,
                        enabled: false,
                        credentials: smtp_relay(
                            host: "smtp.relay.example",
                            port: 587,
                            username: "courier",
                            password: "secret",
                            tls: required,
                        ),
                    ),
                ],
                dispatcher: (
                    sender: "campaigns@example.com",
                    pacing_ms: 25,
                ),
                tick_interval_secs: Some(60),
            )"#,
        )
        .unwrap();

        assert_eq!(config.quota.hourly, Some(200));
        assert_eq!(config.providers.len(), 2);
        assert!(config.providers[0].enabled);
        assert!(!config.providers[1].enabled);
        assert!(matches!(
            config.providers[0].credentials,
            ProviderCredentials::HttpApi { .. }
        ));
        match &config.providers[1].credentials {
            ProviderCredentials::SmtpRelay { tls, port, .. } => {
                assert_eq!(*tls, RelayTls::Required);
                assert_eq!(*port, 587);
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
        assert_eq!(config.dispatcher.pacing_ms, 25);
        assert_eq!(config.tick_interval_secs, Some(60));
        assert_eq!(
            config.control_socket,
            courier_control::DEFAULT_CONTROL_SOCKET
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = ron::from_str("()").unwrap();
        assert!(!config.quota.configured());
        assert!(config.providers.is_empty());
        assert!(config.tick_interval_secs.is_none());
    }
}
