//! StatsD delivery sink.
//!
//! Sends metrics to a StatsD/DogStatsD agent over raw UDP sockets. The
//! sink consumes the custom JSON envelope and emits one gauge line per
//! metric entry:
//!
//! ```text
//! <PREFIX>.<NAME>:<VALUE>|g|#<TAG1>:<VALUE1>,<TAG2>:<VALUE2>
//! ```
//!
//! UDP is fire-and-forget: the socket is non-blocking and a datagram that
//! would block is dropped rather than stalling the push tick.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use async_trait::async_trait;
use pharos_common::{CommonError, CommonResult};
use pharos_core::DeliverySink;
use tracing::{trace, warn};

/// Default agent address (StatsD default port).
pub const DEFAULT_STATSD_ADDR: &str = "127.0.0.1:8125";

/// Delivers the JSON metric envelope as StatsD gauge datagrams.
#[derive(Debug)]
pub struct StatsdDeliverySink {
    name: String,
    socket: UdpSocket,
    agent_addr: SocketAddr,
    prefix: String,
}

impl StatsdDeliverySink {
    /// Create a sink targeting the default local agent.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> io::Result<Self> {
        let addr = DEFAULT_STATSD_ADDR
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid agent address"))?;
        Self::with_addr(name, prefix, addr)
    }

    /// Create a sink targeting a specific agent address.
    pub fn with_addr(
        name: impl Into<String>,
        prefix: impl Into<String>,
        agent_addr: SocketAddr,
    ) -> io::Result<Self> {
        // Bind to any available port; the OS assigns one.
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self { name: name.into(), socket, agent_addr, prefix: prefix.into() })
    }

    /// Build one gauge line: `prefix.name:value|g|#k:v,...`.
    fn gauge_line(&self, name: &str, value: f64, tags: &[(String, String)]) -> String {
        let full_name = format!("{}.{}", self.prefix, name);
        if tags.is_empty() {
            format!("{full_name}:{value}|g")
        } else {
            let tag_str: Vec<String> =
                tags.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            format!("{}:{}|g|#{}", full_name, value, tag_str.join(","))
        }
    }

    fn send_line(&self, line: &str) -> CommonResult<()> {
        match self.socket.send_to(line.as_bytes(), self.agent_addr) {
            Ok(_) => {
                trace!(sink = %self.name, %line, "Sent StatsD datagram");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // Non-blocking socket would block; drop the datagram.
                warn!(sink = %self.name, "Dropped StatsD datagram: send would block");
                Ok(())
            }
            Err(e) => Err(CommonError::delivery(&self.name, e)),
        }
    }
}

#[async_trait]
impl DeliverySink for StatsdDeliverySink {
    async fn deliver(&self, payload: &str, _content_type: &str) -> CommonResult<()> {
        let envelope: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| CommonError::encoding("statsd", e))?;
        let Some(metrics) = envelope.get("metrics").and_then(|m| m.as_array()) else {
            return Err(CommonError::encoding("statsd", "payload has no metrics array"));
        };

        for metric in metrics {
            let Some(name) = metric.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            let Some(value) = metric.get("value").and_then(serde_json::Value::as_f64) else {
                continue;
            };
            let tags: Vec<(String, String)> = metric
                .get("tags")
                .and_then(|t| t.as_object())
                .map(|tags| {
                    tags.iter()
                        .filter_map(|(k, v)| {
                            v.as_str().map(|v| (k.clone(), v.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();

            self.send_line(&self.gauge_line(name, value, &tags))?;
        }
        Ok(())
    }
}
