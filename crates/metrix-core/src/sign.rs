//! Keyed integrity code over a metric's canonical text.
//!
//! Canonical text:
//! - counter: `{id}:counter:{delta}` (base 10)
//! - gauge:   `{id}:gauge:{value}` (fixed notation, six decimals)
//!
//! The format must match byte for byte what agents sign, so it is not derived
//! from `Display` impls that might change.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{MetricsError, Result};
use crate::metric::{Metric, MetricType};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer. An empty key disables signing.
#[derive(Clone, Default)]
pub struct Signer {
    key: Vec<u8>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Signer {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.key.is_empty()
    }

    /// Canonical text the code is computed over.
    pub fn canonical(metric: &Metric) -> Result<String> {
        match metric.mtype {
            MetricType::Counter => {
                let delta = metric
                    .delta
                    .ok_or_else(|| MetricsError::InvalidValue(format!("counter {} has no delta", metric.id)))?;
                Ok(format!("{}:{}:{}", metric.id, metric.mtype, delta))
            }
            MetricType::Gauge => {
                let value = metric
                    .value
                    .ok_or_else(|| MetricsError::InvalidValue(format!("gauge {} has no value", metric.id)))?;
                Ok(format!("{}:{}:{:.6}", metric.id, metric.mtype, value))
            }
        }
    }

    fn mac(&self, metric: &Metric) -> Result<HmacSha256> {
        let src = Self::canonical(metric)?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| MetricsError::Internal(format!("hmac key rejected: {e}")))?;
        mac.update(src.as_bytes());
        Ok(mac)
    }

    /// Raw code; empty when signing is disabled.
    pub fn sign(&self, metric: &Metric) -> Result<Vec<u8>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        Ok(self.mac(metric)?.finalize().into_bytes().to_vec())
    }

    /// Hex-encoded code; empty when signing is disabled.
    pub fn sign_hex(&self, metric: &Metric) -> Result<String> {
        self.sign(metric).map(hex::encode)
    }

    /// Recompute and store `hash` (cleared when signing is disabled).
    pub fn apply(&self, metric: &mut Metric) -> Result<()> {
        metric.hash = if self.is_enabled() {
            Some(self.sign_hex(metric)?)
        } else {
            None
        };
        Ok(())
    }

    /// Check `metric.hash` against the recomputed code in constant time.
    /// Always succeeds when signing is disabled.
    pub fn verify(&self, metric: &Metric) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mac = self.mac(metric)?;
        let claimed = metric
            .hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(MetricsError::InvalidSignature)?;
        let claimed = hex::decode(claimed).map_err(|_| MetricsError::InvalidSignature)?;
        mac.verify_slice(&claimed)
            .map_err(|_| MetricsError::InvalidSignature)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn signed(signer: &Signer, mut m: Metric) -> Metric {
        signer.apply(&mut m).unwrap();
        m
    }

    #[test]
    fn canonical_text() {
        assert_eq!(Signer::canonical(&Metric::counter("hits", 8)).unwrap(), "hits:counter:8");
        assert_eq!(Signer::canonical(&Metric::gauge("temp", 11.0)).unwrap(), "temp:gauge:11.000000");
        assert_eq!(Signer::canonical(&Metric::gauge("big", 1e20)).unwrap(), "big:gauge:100000000000000000000.000000");
    }

    #[test]
    fn round_trip() {
        let signer = Signer::new("k");
        let m = signed(&signer, Metric::counter("hits", 8));
        assert_eq!(m.hash.as_deref().map(str::len), Some(64));
        signer.verify(&m).unwrap();
    }

    #[test]
    fn other_key_fails() {
        let m = signed(&Signer::new("k"), Metric::counter("hits", 8));
        assert!(matches!(Signer::new("other").verify(&m), Err(MetricsError::InvalidSignature)));
    }

    #[test]
    fn tampering_fails() {
        let signer = Signer::new("k");
        let m = signed(&signer, Metric::gauge("temp", 11.0));

        let mut changed_value = m.clone();
        changed_value.value = Some(12.0);
        assert!(signer.verify(&changed_value).is_err());

        let mut changed_name = m.clone();
        changed_name.id = "tempx".into();
        assert!(signer.verify(&changed_name).is_err());

        let mut flipped = m.clone();
        let mut bytes = hex::decode(flipped.hash.as_deref().unwrap()).unwrap();
        bytes[0] ^= 0x01;
        flipped.hash = Some(hex::encode(bytes));
        assert!(matches!(signer.verify(&flipped), Err(MetricsError::InvalidSignature)));
    }

    #[test]
    fn malformed_or_missing_signature() {
        let signer = Signer::new("k");
        let mut m = Metric::counter("hits", 1);
        assert!(matches!(signer.verify(&m), Err(MetricsError::InvalidSignature)));
        m.hash = Some("zz-not-hex".into());
        assert!(matches!(signer.verify(&m), Err(MetricsError::InvalidSignature)));
    }

    #[test]
    fn missing_value_is_invalid_value() {
        let signer = Signer::new("k");
        let m = Metric::new(MetricType::Gauge, "g");
        assert!(matches!(signer.sign(&m), Err(MetricsError::InvalidValue(_))));
        assert!(matches!(signer.verify(&m), Err(MetricsError::InvalidValue(_))));
    }

    #[test]
    fn empty_key_is_noop() {
        let signer = Signer::new("");
        assert!(signer.sign(&Metric::counter("hits", 1)).unwrap().is_empty());
        let mut m = Metric::counter("hits", 1);
        m.hash = Some("garbage".into());
        signer.verify(&m).unwrap();
        signer.apply(&mut m).unwrap();
        assert!(m.hash.is_none());
    }
}
