//! JSON test vector loader shared by signature tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::Deserialize;

use metrix_core::Metric;

#[derive(Debug, Deserialize)]
pub struct SignVector {
    pub description: String,
    pub key: String,
    pub metric: serde_json::Value,
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

impl SignVector {
    pub fn metric(&self) -> Metric {
        let raw = serde_json::to_vec(&self.metric).unwrap();
        Metric::from_json(&raw).expect("vector metric must decode")
    }
}

pub fn load(name: &str) -> SignVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}
