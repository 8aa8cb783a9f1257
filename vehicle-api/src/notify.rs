//! Change notifier
//!
//! Forwards committed writes on selected signals to sibling services as
//! `POST <url>` with body `{"value": ...}`. Notifications are fire and
//! forget: each runs on its own task with its own timeout, after the store
//! lock has been released, and a failure never affects the write itself.

use reqwest::Client;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use vehicle_core::{Scalar, SignalChange};

/// Errors from change notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Target returned status {0}")]
    Status(u16),

    #[error("Invalid notify target '{0}', expected ADDRESS=URL")]
    InvalidTarget(String),
}

/// One watched signal and where to forward it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub address: String,
    pub url: String,
}

impl FromStr for NotifyTarget {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=').map(|(a, u)| (a.trim(), u.trim())) {
            Some((address, url)) if !address.is_empty() && !url.is_empty() => Ok(Self {
                address: address.to_string(),
                url: url.to_string(),
            }),
            _ => Err(NotifyError::InvalidTarget(s.to_string())),
        }
    }
}

/// Notifier configuration
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub targets: Vec<NotifyTarget>,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            timeout_ms: 1000,
        }
    }
}

/// Best-effort HTTP forwarder for signal changes
pub struct ChangeNotifier {
    client: Client,
    targets: Vec<NotifyTarget>,
}

impl ChangeNotifier {
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NotifyError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            targets: config.targets,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets watching `address`
    pub fn targets_for<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a NotifyTarget> {
        self.targets.iter().filter(move |t| t.address == address)
    }

    /// Spawn one notification per matching target
    ///
    /// Must be called from within a tokio runtime. The returned handles can
    /// be awaited, but callers normally drop them.
    pub fn notify(&self, change: &SignalChange) -> Vec<JoinHandle<()>> {
        self.targets_for(&change.address)
            .map(|target| {
                let client = self.client.clone();
                let url = target.url.clone();
                let address = change.address.clone();
                let value = change.new.clone();

                tokio::spawn(async move {
                    match send_value(&client, &url, &value).await {
                        Ok(()) => debug!("Notified {} of {} = {}", url, address, value),
                        Err(e) => error!("Failed to notify {} of {}: {}", url, address, e),
                    }
                })
            })
            .collect()
    }
}

/// POST `{"value": value}` to `url`
pub async fn send_value(client: &Client, url: &str, value: &Scalar) -> Result<(), NotifyError> {
    let response = client
        .post(url)
        .json(&json!({ "value": value }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(NotifyError::Status(response.status().as_u16()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn change(address: &str, value: Scalar) -> SignalChange {
        SignalChange {
            address: address.to_string(),
            old: Scalar::Float(22.5),
            new: value,
            changed_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_target() {
        let target: NotifyTarget = "InsideTemperature=http://hvac:8080/api/v1/hvac"
            .parse()
            .unwrap();
        assert_eq!(target.address, "InsideTemperature");
        assert_eq!(target.url, "http://hvac:8080/api/v1/hvac");

        assert!("no-separator".parse::<NotifyTarget>().is_err());
        assert!("=http://x".parse::<NotifyTarget>().is_err());
        assert!(" =http://x".parse::<NotifyTarget>().is_err());
        assert!("VehicleSpeed=  ".parse::<NotifyTarget>().is_err());

        let padded: NotifyTarget = " VehicleSpeed = http://x ".parse().unwrap();
        assert_eq!(padded.address, "VehicleSpeed");
        assert_eq!(padded.url, "http://x");
    }

    #[test]
    fn test_targets_for_filters_by_address() {
        let notifier = ChangeNotifier::new(NotifyConfig {
            targets: vec![
                "InsideTemperature=http://a".parse().unwrap(),
                "VehicleSpeed=http://b".parse().unwrap(),
                "InsideTemperature=http://c".parse().unwrap(),
            ],
            ..Default::default()
        })
        .unwrap();

        let urls: Vec<_> = notifier
            .targets_for("InsideTemperature")
            .map(|t| t.url.as_str())
            .collect();
        assert_eq!(urls, vec!["http://a", "http://c"]);
        assert_eq!(notifier.targets_for("ODO").count(), 0);
    }

    #[tokio::test]
    async fn test_notify_posts_value() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !String::from_utf8_lossy(&received).contains("\"value\"") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        let notifier = ChangeNotifier::new(NotifyConfig {
            targets: vec![NotifyTarget {
                address: "InsideTemperature".to_string(),
                url: format!("http://{}/api/v1/vehicle/InsideTemperature", addr),
            }],
            ..Default::default()
        })
        .unwrap();

        let handles = notifier.notify(&change("InsideTemperature", Scalar::Float(24.0)));
        assert_eq!(handles.len(), 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v1/vehicle/InsideTemperature"));
        assert!(request.contains(r#"{"value":24.0}"#));

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_unreachable_target_is_not_fatal() {
        let notifier = ChangeNotifier::new(NotifyConfig {
            targets: vec!["VehicleSpeed=http://127.0.0.1:9/unreachable".parse().unwrap()],
            timeout_ms: 200,
        })
        .unwrap();

        for handle in notifier.notify(&change("VehicleSpeed", Scalar::Int(10))) {
            assert!(handle.await.is_ok());
        }
    }
}
