//! Shared test helpers for companion client tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dosedock_companion::{CompanionError, CompanionResult, CompanionTransport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted transport response.
pub enum Scripted {
    Ok(serde_json::Value),
    Status(u16),
    ConnectionError,
}

/// Transport that replays a script of responses and counts calls.
///
/// Once the script runs out, the fallback answers every further call;
/// without a fallback, exhaustion is a connection error.
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<serde_json::Value>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Transport that always answers with the given body.
    pub fn always(body: serde_json::Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(body),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> CompanionResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Ok(body)) => Ok(body),
            Some(Scripted::Status(code)) => Err(CompanionError::Status(code)),
            Some(Scripted::ConnectionError) => {
                Err(CompanionError::Connection("connection refused".to_string()))
            }
            None => match &self.fallback {
                Some(body) => Ok(body.clone()),
                None => Err(CompanionError::Connection("connection refused".to_string())),
            },
        }
    }
}

#[async_trait]
impl CompanionTransport for MockTransport {
    async fn get_json(&self, _path: &str) -> CompanionResult<serde_json::Value> {
        self.next()
    }

    async fn post_empty(&self, _path: &str) -> CompanionResult<()> {
        self.next().map(|_| ())
    }
}
