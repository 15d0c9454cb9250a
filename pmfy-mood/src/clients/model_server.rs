//! HTTP client for the mood model server
//!
//! The server scores one feature row per request at `/predict-features` and
//! answers `{"mood": "<label>"}` or `{"error": "<message>"}`.

use super::{build_http_client, Classifier};
use crate::error::ClassifierError;
use crate::models::FeatureMatrix;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use std::time::Duration;

const DEFAULT_PARALLEL_REQUESTS: usize = 4;

pub struct ModelServerClassifier {
    http_client: reqwest::Client,
    endpoint: String,
    parallel_requests: usize,
}

impl ModelServerClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            endpoint: format!("{}/predict-features", base_url.trim_end_matches('/')),
            parallel_requests: DEFAULT_PARALLEL_REQUESTS,
        })
    }

    pub fn with_parallel_requests(mut self, parallel_requests: usize) -> Self {
        self.parallel_requests = parallel_requests.max(1);
        self
    }

    async fn predict_row(&self, payload: Value) -> Result<i64, ClassifierError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassifierError::Model(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        parse_prediction(&body)
    }
}

#[async_trait]
impl Classifier for ModelServerClassifier {
    async fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i64>, ClassifierError> {
        tracing::debug!(rows = matrix.len(), endpoint = %self.endpoint, "Requesting mood predictions");

        // `buffered` keeps results in row order
        stream::iter(row_payloads(matrix))
            .map(|payload| self.predict_row(payload))
            .buffered(self.parallel_requests)
            .try_collect()
            .await
    }
}

/// One JSON object per row, keyed by column name
fn row_payloads(matrix: &FeatureMatrix) -> Vec<Value> {
    matrix
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = matrix
                .columns
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_string(), Value::from(*value)))
                .collect();
            Value::Object(object)
        })
        .collect()
}

fn parse_prediction(body: &Value) -> Result<i64, ClassifierError> {
    if let Some(error) = body.get("error") {
        return Err(ClassifierError::Model(
            error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()),
        ));
    }

    match body.get("mood") {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ClassifierError::Parse(format!("non-integer mood {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ClassifierError::Parse(format!("non-integer mood '{}'", s))),
        Some(other) => Err(ClassifierError::Parse(format!("unexpected mood value {}", other))),
        None => Err(ClassifierError::Parse("response has no mood field".to_string())),
    }
}
