//! Metric entity and numeric input conversion.
//!
//! A metric is identified by `(type, name)`. Gauges carry `value`, counters
//! carry `delta`; the other field stays absent (absence is not zero).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Closed set of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Latest value replaces the prior one.
    Gauge,
    /// Reported values accumulate.
    Counter,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gauge" => Ok(MetricType::Gauge),
            "counter" => Ok(MetricType::Counter),
            "" => Err(MetricsError::InvalidType),
            other => Err(MetricsError::UnknownType(other.to_string())),
        }
    }
}

/// Store identity of a metric.
pub type MetricKey = (MetricType, String);

/// One named, typed measurement (also the persisted line format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub mtype: MetricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    /// Hex-encoded HMAC, only present when signing is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Inbound shape: the type stays a string so unknown kinds are reported as
/// `UnknownType` rather than a decode failure.
#[derive(Debug, Deserialize)]
struct WireMetric {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    mtype: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    delta: Option<i64>,
    #[serde(default)]
    hash: Option<String>,
}

impl Metric {
    /// Fresh metric with absent value/delta.
    pub fn new(mtype: MetricType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mtype,
            value: None,
            delta: None,
            hash: None,
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::new(MetricType::Gauge, id)
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            delta: Some(delta),
            ..Self::new(MetricType::Counter, id)
        }
    }

    pub fn key(&self) -> MetricKey {
        (self.mtype, self.id.clone())
    }

    /// Decode an inbound JSON document.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let wire: WireMetric =
            serde_json::from_slice(data).map_err(|e| MetricsError::InvalidJson(e.to_string()))?;
        wire.into_metric()
    }

    /// Decode an inbound JSON array of metrics.
    pub fn slice_from_json(data: &[u8]) -> Result<Vec<Self>> {
        let wire: Vec<WireMetric> =
            serde_json::from_slice(data).map_err(|e| MetricsError::InvalidJson(e.to_string()))?;
        wire.into_iter().map(WireMetric::into_metric).collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| MetricsError::Internal(format!("json encode failed: {e}")))
    }

    /// Name non-empty and the field matching the type present.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(MetricsError::InvalidName);
        }
        match self.mtype {
            MetricType::Gauge if self.value.is_none() => {
                Err(MetricsError::InvalidValue(format!("gauge {} has no value", self.id)))
            }
            MetricType::Counter if self.delta.is_none() => {
                Err(MetricsError::InvalidValue(format!("counter {} has no delta", self.id)))
            }
            _ => Ok(()),
        }
    }

    /// The measurement as an input for the store update path.
    pub fn input(&self) -> Result<MetricInput> {
        let input = match self.mtype {
            MetricType::Gauge => self.value.map(MetricInput::Float),
            MetricType::Counter => self.delta.map(MetricInput::Int),
        };
        input.ok_or_else(|| MetricsError::InvalidValue(format!("{} {} has no measurement", self.mtype, self.id)))
    }

    /// Gauge: shortest round-trip decimal; counter: base-10 integer.
    /// `NotFound` if the field for the type is absent.
    pub fn formatted_value(&self) -> Result<String> {
        let formatted = match self.mtype {
            MetricType::Gauge => self.value.map(|v| v.to_string()),
            MetricType::Counter => self.delta.map(|d| d.to_string()),
        };
        formatted.ok_or(MetricsError::NotFound)
    }
}

impl WireMetric {
    fn into_metric(self) -> Result<Metric> {
        let mtype = self.mtype.parse()?;
        Ok(Metric {
            id: self.id,
            mtype,
            value: self.value,
            delta: self.delta,
            hash: self.hash,
        })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formatted_value() {
            Ok(v) => write!(f, "{}/{}/{}", self.mtype, self.id, v),
            Err(_) => write!(f, "{}/{}/<empty>", self.mtype, self.id),
        }
    }
}

/// Caller-supplied measurement before conversion to the canonical field.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricInput {
    Text(String),
    Int(i64),
    Float(f64),
}

impl MetricInput {
    /// Convert for a gauge.
    pub fn to_f64(&self) -> Result<f64> {
        let v = match self {
            MetricInput::Text(s) => s
                .parse::<f64>()
                .map_err(|_| MetricsError::InvalidValue(format!("not a float: {s:?}")))?,
            MetricInput::Int(i) => *i as f64,
            MetricInput::Float(f) => *f,
        };
        if !v.is_finite() {
            return Err(MetricsError::InvalidValue(format!("not a finite float: {v}")));
        }
        Ok(v)
    }

    /// Convert for a counter. Float strings are rejected; float numbers only
    /// when integral and in range.
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            MetricInput::Text(s) => s
                .parse::<i64>()
                .map_err(|_| MetricsError::InvalidValue(format!("not an integer: {s:?}"))),
            MetricInput::Int(i) => Ok(*i),
            MetricInput::Float(f) => {
                // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
                if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(*f as i64)
                } else {
                    Err(MetricsError::InvalidValue(format!("not an integral number: {f}")))
                }
            }
        }
    }
}

impl From<&str> for MetricInput {
    fn from(s: &str) -> Self {
        MetricInput::Text(s.to_string())
    }
}

impl From<String> for MetricInput {
    fn from(s: String) -> Self {
        MetricInput::Text(s)
    }
}

impl From<i64> for MetricInput {
    fn from(v: i64) -> Self {
        MetricInput::Int(v)
    }
}

impl From<f64> for MetricInput {
    fn from(v: f64) -> Self {
        MetricInput::Float(v)
    }
}
