//! Scriptable embedding backend for tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use insight_llm::LlmError;

use crate::error::EmbeddingError;
use crate::provider::EmbeddingBackend;

/// Outcome a [`MockBackend`] produces on every call.
enum MockOutcome {
    Vector(Vec<f32>),
    Failure,
    Quota,
}

/// Embedding backend with a fixed scripted outcome and a call counter.
pub struct MockBackend {
    name: String,
    outcome: MockOutcome,
    calls: AtomicU32,
}

impl MockBackend {
    /// Backend that always returns `vector`.
    pub fn returning(name: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            outcome: MockOutcome::Vector(vector),
            calls: AtomicU32::new(0),
        }
    }

    /// Backend that always fails with a capability error.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: MockOutcome::Failure,
            calls: AtomicU32::new(0),
        }
    }

    /// Backend that always fails with a quota-class error.
    pub fn quota_limited(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: MockOutcome::Quota,
            calls: AtomicU32::new(0),
        }
    }

    /// How many times `embed` has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Vector(vector) => Ok(vector.clone()),
            MockOutcome::Failure => Err(EmbeddingError::Api {
                backend: self.name.clone(),
                status: 503,
                message: "mock backend unavailable".into(),
            }),
            MockOutcome::Quota => Err(EmbeddingError::Llm(LlmError::RateLimited(
                "mock quota exhausted".into(),
            ))),
        }
    }
}
