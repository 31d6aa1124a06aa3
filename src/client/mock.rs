//! Mock command bridge for testing
//!
//! Scripts envelopes per command name and records every invocation so tests
//! can assert on call counts, arguments and timing without a devtunnel binary.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use super::{CommandBridge, CommandResponse};

/// A recorded bridge invocation
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub command: String,
    pub args: Value,
    pub at: Instant,
}

/// Mock bridge for testing.
///
/// Responses queue up per command. Each call consumes the front of the queue,
/// except the last scripted response which is repeated for every further call.
///
/// # Example
/// ```ignore
/// let mock = MockBridge::new()
///     .with_failure("show_tunnel", "timeout")
///     .with_success("show_tunnel", json!("Tunnel ID : t1"));
/// ```
#[derive(Default)]
pub struct MockBridge {
    responses: Mutex<HashMap<String, VecDeque<CommandResponse<Value>>>>,
    calls: Mutex<Vec<CapturedCall>>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary envelope for `command`.
    pub fn with_response(self, command: &str, response: CommandResponse<Value>) -> Self {
        self.push(command, response);
        self
    }

    /// Queue a successful envelope carrying `data`.
    pub fn with_success(self, command: &str, data: Value) -> Self {
        self.with_response(command, CommandResponse::success(data))
    }

    /// Queue a failed envelope carrying `message`.
    pub fn with_failure(self, command: &str, message: &str) -> Self {
        self.with_response(command, CommandResponse::error(message))
    }

    /// Queue a response after construction, e.g. between two service calls.
    pub fn push(&self, command: &str, response: CommandResponse<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(response);
    }

    /// Drop every scripted response for `command`.
    pub fn clear(&self, command: &str) {
        self.responses.lock().unwrap().remove(command);
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.command == command)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instants at which `command` was invoked, in call order
    pub fn call_instants(&self, command: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.command == command)
            .map(|c| c.at)
            .collect()
    }

    /// Arguments passed to `command`, in call order
    pub fn call_args(&self, command: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.command == command)
            .map(|c| c.args.clone())
            .collect()
    }
}

#[async_trait]
impl CommandBridge for MockBridge {
    async fn invoke(&self, command: &str, args: Value) -> CommandResponse<Value> {
        self.calls.lock().unwrap().push(CapturedCall {
            command: command.to_string(),
            args,
            at: Instant::now(),
        });

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => CommandResponse::error(format!("mock: no response scripted for {}", command)),
        }
    }
}
