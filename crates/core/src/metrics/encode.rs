//! Wire-format encoders for metric snapshots.
//!
//! Three encodings of the same data: the Prometheus text exposition format
//! (the one external contract that must be byte-stable), an
//! OpenTelemetry-shaped JSON array, and the custom JSON envelope. All three
//! iterate registered definitions in name order and skip series that were
//! recorded without a definition.

use std::collections::HashMap;
use std::time::Duration;

use pharos_domain::{MetricDefinition, MetricSample};
use serde_json::{json, Value};

/// Sanitize a metric or label name to `[a-zA-Z0-9_]`.
pub fn sanitize_name(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}

/// Escape a label value for the text exposition format.
fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Render the `{k="v",...}` clause for a sample; empty string when the
/// sample has no labels.
fn label_clause(sample: &MetricSample) -> String {
    if sample.labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = sample
        .labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k), escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

/// Encode definitions and samples as Prometheus exposition text.
///
/// Per metric: `# HELP <name> <help>`, `# TYPE <name> <type>`, then one
/// `<name>{k="v",...} <value> <timestamp_ms>` line per retained sample.
pub fn prometheus(
    definitions: &[MetricDefinition],
    samples: &HashMap<String, Vec<MetricSample>>,
) -> String {
    let mut out = String::new();
    for def in definitions {
        let name = sanitize_name(&def.name);
        out.push_str(&format!("# HELP {} {}\n", name, def.help.replace('\n', " ")));
        out.push_str(&format!("# TYPE {} {}\n", name, def.kind.as_str()));
        if let Some(series) = samples.get(&def.name) {
            for sample in series {
                out.push_str(&format!(
                    "{}{} {} {}\n",
                    name,
                    label_clause(sample),
                    sample.value,
                    sample.timestamp_ms
                ));
            }
        }
    }
    out
}

/// Encode as an OpenTelemetry-shaped JSON array: one object per metric with
/// its data points.
pub fn opentelemetry(
    definitions: &[MetricDefinition],
    samples: &HashMap<String, Vec<MetricSample>>,
) -> Value {
    let metrics: Vec<Value> = definitions
        .iter()
        .map(|def| {
            let data_points: Vec<Value> = samples
                .get(&def.name)
                .map(|series| {
                    series
                        .iter()
                        .map(|s| {
                            json!({
                                "value": s.value,
                                "attributes": s.labels,
                                "timeUnixNano": s.timestamp_ms * 1_000_000,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "name": def.name,
                "description": def.help,
                "type": def.kind.as_str(),
                "dataPoints": data_points,
            })
        })
        .collect();
    Value::Array(metrics)
}

/// Encode as the custom JSON envelope:
/// `{ metrics: [{name, value, timestamp, tags, type}], metadata: {...} }`.
pub fn custom_json(
    definitions: &[MetricDefinition],
    samples: &HashMap<String, Vec<MetricSample>>,
    source: &str,
    interval: Duration,
) -> Value {
    let mut metrics = Vec::new();
    for def in definitions {
        if let Some(series) = samples.get(&def.name) {
            for sample in series {
                metrics.push(json!({
                    "name": def.name,
                    "value": sample.value,
                    "timestamp": sample.timestamp_ms,
                    "tags": sample.labels,
                    "type": def.kind.as_str(),
                }));
            }
        }
    }
    json!({
        "metrics": metrics,
        "metadata": {
            "source": source,
            "version": env!("CARGO_PKG_VERSION"),
            "interval": interval.as_millis() as u64,
        }
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for metrics::encode.
    use pharos_domain::{labels, MetricKind};

    use super::*;

    fn fixture() -> (Vec<MetricDefinition>, HashMap<String, Vec<MetricSample>>) {
        let defs = vec![MetricDefinition::new(
            "requests_total",
            MetricKind::Counter,
            "Total requests",
        )
        .with_labels(&["method"])];
        let mut samples = HashMap::new();
        samples.insert(
            "requests_total".to_string(),
            vec![MetricSample::new(3.0, 1700000000000, labels(&[("method", "GET")]))],
        );
        (defs, samples)
    }

    /// Validates the exposition layout byte for byte.
    #[test]
    fn test_prometheus_layout() {
        let (defs, samples) = fixture();
        let text = prometheus(&defs, &samples);
        assert_eq!(
            text,
            "# HELP requests_total Total requests\n\
             # TYPE requests_total counter\n\
             requests_total{method=\"GET\"} 3 1700000000000\n"
        );
    }

    /// Validates a sample without labels omits the brace clause.
    #[test]
    fn test_prometheus_no_labels() {
        let defs =
            vec![MetricDefinition::new("uptime_seconds", MetricKind::Gauge, "Process uptime")];
        let mut samples = HashMap::new();
        samples.insert(
            "uptime_seconds".to_string(),
            vec![MetricSample::new(12.5, 1000, labels(&[]))],
        );
        let text = prometheus(&defs, &samples);
        assert!(text.contains("uptime_seconds 12.5 1000\n"));
    }

    /// Validates name sanitization to the allowed character set.
    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("api.request-rate"), "api_request_rate");
        assert_eq!(sanitize_name("already_ok_123"), "already_ok_123");
    }

    /// Validates label values survive quoting.
    #[test]
    fn test_label_value_escaping() {
        let defs = vec![MetricDefinition::new("m", MetricKind::Gauge, "m")];
        let mut samples = HashMap::new();
        samples.insert(
            "m".to_string(),
            vec![MetricSample::new(1.0, 1, labels(&[("path", "a\"b\\c")]))],
        );
        let text = prometheus(&defs, &samples);
        assert!(text.contains(r#"m{path="a\"b\\c"} 1 1"#));
    }

    /// Validates a definition with no samples still emits its header.
    #[test]
    fn test_definition_without_samples() {
        let defs = vec![MetricDefinition::new("empty_total", MetricKind::Counter, "none yet")];
        let text = prometheus(&defs, &HashMap::new());
        assert!(text.contains("# HELP empty_total none yet\n"));
        assert!(text.contains("# TYPE empty_total counter\n"));
        assert!(!text.contains("empty_total "));
    }

    /// Validates the OpenTelemetry shape and nanosecond conversion.
    #[test]
    fn test_opentelemetry_shape() {
        let (defs, samples) = fixture();
        let value = opentelemetry(&defs, &samples);
        let point = &value[0]["dataPoints"][0];
        assert_eq!(value[0]["name"], "requests_total");
        assert_eq!(value[0]["type"], "counter");
        assert_eq!(point["value"], 3.0);
        assert_eq!(point["attributes"]["method"], "GET");
        assert_eq!(point["timeUnixNano"], 1_700_000_000_000_000_000u64);
    }

    /// Validates the custom JSON envelope including metadata.
    #[test]
    fn test_custom_json_envelope() {
        let (defs, samples) = fixture();
        let value = custom_json(&defs, &samples, "gateway", Duration::from_secs(60));
        assert_eq!(value["metrics"][0]["name"], "requests_total");
        assert_eq!(value["metrics"][0]["tags"]["method"], "GET");
        assert_eq!(value["metadata"]["source"], "gateway");
        assert_eq!(value["metadata"]["interval"], 60000);
    }
}
