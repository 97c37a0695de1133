//! Prometheus metrics collection for chatrelay
//!
//! Tracks chat request outcomes and outbound completion latency. Metrics are
//! exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::error::CompletionError;

/// Outcome of a chat request, used as a metrics label
///
/// A closed enum keeps label cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    InvalidRequest,
    Serialization,
    Transport,
    Remote,
    Deserialization,
    EmptyResult,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::Success,
        Outcome::InvalidRequest,
        Outcome::Serialization,
        Outcome::Transport,
        Outcome::Remote,
        Outcome::Deserialization,
        Outcome::EmptyResult,
    ];

    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::InvalidRequest => "invalid_request",
            Outcome::Serialization => "serialization",
            Outcome::Transport => "transport",
            Outcome::Remote => "remote",
            Outcome::Deserialization => "deserialization",
            Outcome::EmptyResult => "empty_result",
        }
    }
}

impl From<&CompletionError> for Outcome {
    fn from(err: &CompletionError) -> Self {
        match err {
            CompletionError::Serialization(_) => Outcome::Serialization,
            CompletionError::Transport { .. } => Outcome::Transport,
            CompletionError::Remote { .. } => Outcome::Remote,
            CompletionError::Deserialization(_) => Outcome::Deserialization,
            CompletionError::EmptyResult => Outcome::EmptyResult,
        }
    }
}

/// Metrics collector for chatrelay
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    chat_requests: IntCounterVec,
    completion_duration: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let chat_requests = IntCounterVec::new(
            Opts::new(
                "chatrelay_chat_requests_total",
                "Total number of chat requests by outcome",
            ),
            &["outcome"],
        )?;

        let completion_duration = Histogram::with_opts(
            HistogramOpts::new(
                "chatrelay_completion_duration_seconds",
                "Latency of outbound completion calls in seconds, including failures",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(chat_requests.clone()))?;
        registry.register(Box::new(completion_duration.clone()))?;

        // Pre-create every label so all series are exported from the start
        for outcome in Outcome::ALL {
            chat_requests.get_metric_with_label_values(&[outcome.as_str()])?;
        }

        Ok(Self {
            registry: Arc::new(registry),
            chat_requests,
            completion_duration,
        })
    }

    pub fn record_chat_request(&self, outcome: Outcome) -> Result<(), prometheus::Error> {
        self.chat_requests
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    pub fn record_completion_duration(&self, seconds: f64) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be a finite, non-negative duration, got: {}",
                seconds
            )));
        }
        self.completion_duration.observe(seconds);
        Ok(())
    }

    /// Current count for an outcome
    pub fn chat_request_count(&self, outcome: Outcome) -> u64 {
        self.chat_requests
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Number of completion latency samples recorded
    pub fn completion_sample_count(&self) -> u64 {
        self.completion_duration.get_sample_count()
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_families.len(),
                "Prometheus text encoder failed"
            );
            e
        })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Metrics output is not valid UTF-8: {}", e))
        })
    }
}
