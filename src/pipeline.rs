//! Online inference pipeline.
//!
//! validate -> canonicalize -> infer -> classify -> audit, run to completion
//! per request. Audit rows for failed inferences are written before the
//! error is handed back to the caller.

use crate::audit::{AuditLogger, AuditRecord};
use crate::canonicalizer::{CanonicalRecord, FeatureCanonicalizer};
use crate::error::{InferenceError, PipelineError};
use crate::metrics::ServiceMetrics;
use crate::models::classifier::RawPrediction;
use crate::models::handle::{ModelHandle, ReadyModel};
use crate::models::inference::InferenceEngine;
use crate::schema::FeatureSchema;
use crate::types::outcome::PredictionOutcome;
use crate::types::request::InferenceRequest;
use crate::validator::RequestValidator;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Entry point used by the HTTP handlers
pub struct PredictionService {
    engine: InferenceEngine,
    audit: Arc<AuditLogger>,
    metrics: Arc<ServiceMetrics>,
}

impl PredictionService {
    pub fn new(handle: ModelHandle, audit: Arc<AuditLogger>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            engine: InferenceEngine::new(handle),
            audit,
            metrics,
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        self.engine.handle()
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    fn ready_model(&self) -> Result<&ReadyModel, InferenceError> {
        self.engine.handle().get().ok_or_else(|| {
            self.metrics.record_error("model_unavailable");
            InferenceError::ModelUnavailable
        })
    }

    /// Validate and canonicalize one raw request against the schema
    fn prepare(&self, schema: &Arc<FeatureSchema>, request: &InferenceRequest) -> Result<CanonicalRecord, PipelineError> {
        let validated = RequestValidator::new(schema.clone())
            .validate(request)
            .map_err(|e| {
                warn!(field = %e.field, constraint = %e.constraint, "Request rejected");
                self.metrics.record_error("validation");
                e
            })?;

        Ok(FeatureCanonicalizer::new(schema.clone()).canonicalize(&validated))
    }

    /// Turn an inference result into an outcome, auditing either way
    fn finish(
        &self,
        schema: &FeatureSchema,
        record: &CanonicalRecord,
        result: Result<RawPrediction, InferenceError>,
        exec_time: Duration,
    ) -> Result<PredictionOutcome, PipelineError> {
        let fields = audit_fields(schema, record);

        match result {
            Ok(raw) => {
                let outcome = PredictionOutcome::new(raw.label, raw.probability);
                self.audit.record(&AuditRecord::success(
                    fields,
                    outcome.label,
                    outcome.probability,
                    exec_time,
                ));
                self.metrics
                    .record_prediction(exec_time, outcome.probability, outcome.confidence);

                debug!(
                    label = %outcome.label,
                    probability = outcome.probability,
                    confidence = outcome.confidence.as_str(),
                    exec_time_us = exec_time.as_micros() as u64,
                    "Prediction served"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.audit.record(&AuditRecord::failure(fields, exec_time));
                let err = PipelineError::from(e);
                self.metrics.record_error(err.kind());
                error!(error = %err, "Prediction failed");
                Err(err)
            }
        }
    }

    /// Score a single request
    pub fn predict(&self, request: &InferenceRequest) -> Result<PredictionOutcome, PipelineError> {
        let start = Instant::now();
        let model = self.ready_model()?;
        let schema = model.schema();

        let record = self.prepare(schema, request)?;
        let result = self.engine.predict_one(&record);
        self.finish(schema, &record, result, start.elapsed())
    }

    /// Score a batch of raw JSON values.
    ///
    /// The whole call fails only when no model is loaded; otherwise every
    /// input gets its own slot, in order, success or failure.
    pub fn predict_batch(
        &self,
        items: Vec<Value>,
    ) -> Result<Vec<Result<PredictionOutcome, PipelineError>>, PipelineError> {
        let start = Instant::now();
        let model = self.ready_model()?;
        let schema = model.schema();

        let prepared: Vec<Result<CanonicalRecord, PipelineError>> = items
            .into_iter()
            .map(|item| {
                let request = InferenceRequest::try_from(item).map_err(|e| {
                    self.metrics.record_error("validation");
                    PipelineError::from(e)
                })?;
                self.prepare(schema, &request)
            })
            .collect();

        let records: Vec<CanonicalRecord> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok().cloned())
            .collect();
        let mut scored = self.engine.predict_batch(&records).into_iter();

        // Amortized per-item time for audit rows
        let per_item = match records.len() {
            0 => Duration::ZERO,
            n => start.elapsed() / n as u32,
        };

        let results = prepared
            .into_iter()
            .map(|p| {
                let record = p?;
                let result = scored
                    .next()
                    .unwrap_or_else(|| Err(InferenceError::Runtime("batch result missing".to_string())));
                self.finish(schema, &record, result, per_item)
            })
            .collect();

        Ok(results)
    }
}

/// Pair canonical values with schema names for the audit row
fn audit_fields(schema: &FeatureSchema, record: &CanonicalRecord) -> Vec<(String, f64)> {
    schema
        .feature_names()
        .zip(record.values())
        .map(|(name, &value)| (name.to_string(), value as f64))
        .collect()
}
