//! Export formats, delivery auth, and exporter outcomes.

use serde::{Deserialize, Serialize};

/// Wire format an encoded payload is produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Prometheus text exposition format.
    Prometheus,
    /// OpenTelemetry-shaped JSON.
    OpenTelemetry,
    /// Custom JSON envelope.
    Json,
}

impl WireFormat {
    /// HTTP content type for payloads in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Prometheus => "text/plain",
            Self::OpenTelemetry | Self::Json => "application/json",
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prometheus => "prometheus",
            Self::OpenTelemetry => "opentelemetry",
            Self::Json => "json",
        }
    }
}

/// Authentication applied to outbound delivery requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// Bearer token.
        token: String,
    },
    /// HTTP basic auth.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// Static API key sent in a custom header.
    ApiKey {
        /// Header name.
        header: String,
        /// Key value.
        key: String,
    },
}

/// Outcome of one delivery attempt series to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    /// Destination name.
    pub destination: String,
    /// Whether delivery ultimately succeeded.
    pub success: bool,
    /// Wall time spent on the attempt series.
    pub duration_ms: u64,
    /// Final error when delivery failed.
    pub error: Option<String>,
}

/// Running exporter counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterStats {
    /// Total destination-deliveries attempted.
    pub total_exports: u64,
    /// Deliveries that succeeded.
    pub successful_exports: u64,
    /// Deliveries that exhausted retries.
    pub failed_exports: u64,
    /// When the last batch finished, milliseconds since the UNIX epoch.
    pub last_export_at_ms: Option<u64>,
}
