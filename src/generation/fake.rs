//! Scripted provider for tests. Each operation has its own queue of canned
//! responses; an empty queue is reported as an unavailable backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{ChatRequest, LlmProvider, Operation};
use super::GenerationError;

#[derive(Debug, Default)]
pub struct FakeProvider {
    scripted: Mutex<HashMap<Operation, VecDeque<Result<String, GenerationError>>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_ok(&self, op: Operation, raw: impl Into<String>) {
        self.push(op, Ok(raw.into()));
    }

    pub fn push_json(&self, op: Operation, value: serde_json::Value) {
        self.push(op, Ok(value.to_string()));
    }

    pub fn push_err(&self, op: Operation, err: GenerationError) {
        self.push(op, Err(err));
    }

    fn push(&self, op: Operation, item: Result<String, GenerationError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(item);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == op)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self, op: Operation) -> Option<ChatRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.operation == op)
            .cloned()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&request.operation)
            .and_then(|q| q.pop_front());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next.unwrap_or_else(|| {
            Err(GenerationError::Unavailable(format!(
                "no scripted response for {}",
                request.operation
            )))
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
