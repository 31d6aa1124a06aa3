//! Envelope unwrapping and retry with exponential backoff

use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CommandBridge, CommandResponse};
use crate::error::{CommandError, Result};

/// Attempt budget and backoff base for [`Dispatcher::invoke_with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (zero-based):
    /// `base * 2^attempt`, i.e. 1s, 2s, 4s with the default base.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Single choke point for every remote operation.
///
/// Performs no caching; callers decide what to store or invalidate.
pub struct Dispatcher<B: CommandBridge> {
    bridge: B,
    policy: RetryPolicy,
}

impl<B: CommandBridge> Dispatcher<B> {
    pub fn new(bridge: B) -> Self {
        Self::with_policy(bridge, RetryPolicy::default())
    }

    pub fn with_policy(bridge: B, policy: RetryPolicy) -> Self {
        Self { bridge, policy }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invoke `command` once and unwrap its envelope.
    ///
    /// Fails when the envelope reports failure or carries no data. The failure
    /// message is the backend's error, else `fallback`, else a generic one.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
        fallback: Option<&str>,
    ) -> Result<T> {
        debug!("Invoking {}", command);
        let response = self.bridge.invoke(command, args).await;
        unwrap_envelope(command, response, fallback)
    }

    /// Invoke with the configured attempt budget.
    pub async fn invoke_with_retry<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
        fallback: Option<&str>,
    ) -> Result<T> {
        self.invoke_with_attempts(command, args, fallback, self.policy.max_attempts)
            .await
    }

    /// Invoke up to `max_attempts` times, sleeping `delay_for(attempt)` between
    /// attempts. Non-retryable failures and the final attempt's failure are
    /// returned unchanged.
    pub async fn invoke_with_attempts<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
        fallback: Option<&str>,
        max_attempts: u32,
    ) -> Result<T> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.invoke(command, args.clone(), fallback).await {
                Ok(data) => return Ok(data),
                Err(err) if !err.is_retryable() => {
                    debug!("{} failed with a non-retryable error: {}", command, err);
                    return Err(err);
                }
                Err(err) if attempt + 1 >= max_attempts => {
                    warn!(
                        "{} failed after {} attempt(s): {}",
                        command, max_attempts, err
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        command,
                        attempt + 1,
                        max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn unwrap_envelope<T: DeserializeOwned>(
    command: &str,
    response: CommandResponse<Value>,
    fallback: Option<&str>,
) -> Result<T> {
    let data = match response.data {
        Some(data) if response.success && !data.is_null() => data,
        _ => {
            let message = response
                .error
                .filter(|e| !e.trim().is_empty())
                .or_else(|| fallback.map(str::to_string))
                .unwrap_or_else(|| format!("Command '{}' failed", command));
            return Err(CommandError::Failed {
                command: command.to_string(),
                message,
            }
            .into());
        }
    };

    serde_json::from_value(data).map_err(|e| {
        CommandError::InvalidPayload {
            command: command.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBridge;
    use crate::error::Error;
    use serde_json::json;
    use tokio::time::Instant;

    const SHOW: &str = "show_tunnel";

    fn command_message(err: &Error) -> &str {
        match err {
            Error::Command(e) => e.message(),
            other => panic!("Expected Error::Command, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_returns_payload() {
        let mock = MockBridge::new().with_success(SHOW, json!("Tunnel ID : t1"));
        let dispatcher = Dispatcher::new(mock);

        let text: String = dispatcher.invoke(SHOW, json!({}), None).await.unwrap();
        assert_eq!(text, "Tunnel ID : t1");
    }

    #[tokio::test]
    async fn test_invoke_uses_backend_message() {
        let mock = MockBridge::new().with_failure(SHOW, "Tunnel relay busy");
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke::<String>(SHOW, json!({}), Some("Failed to show tunnel"))
            .await
            .unwrap_err();
        assert_eq!(command_message(&err), "Tunnel relay busy");
    }

    #[tokio::test]
    async fn test_invoke_falls_back_when_backend_is_silent() {
        let mock = MockBridge::new().with_response(
            SHOW,
            CommandResponse {
                success: false,
                data: None,
                error: None,
            },
        );
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke::<String>(SHOW, json!({}), Some("Failed to show tunnel"))
            .await
            .unwrap_err();
        assert_eq!(command_message(&err), "Failed to show tunnel");

        let err = dispatcher
            .invoke::<String>(SHOW, json!({}), None)
            .await
            .unwrap_err();
        assert_eq!(command_message(&err), "Command 'show_tunnel' failed");
    }

    #[tokio::test]
    async fn test_invoke_fails_on_success_without_data() {
        let mock = MockBridge::new().with_response(
            SHOW,
            CommandResponse {
                success: true,
                data: None,
                error: None,
            },
        );
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke::<String>(SHOW, json!({}), Some("No details"))
            .await
            .unwrap_err();
        assert_eq!(command_message(&err), "No details");
    }

    #[tokio::test]
    async fn test_invoke_reports_undecodable_payload() {
        let mock = MockBridge::new().with_success(SHOW, json!({"not": "a string"}));
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke::<String>(SHOW, json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Command(CommandError::InvalidPayload { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_invoked_exactly_once() {
        let mock = MockBridge::new().with_failure(SHOW, "Tunnel not found");
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke_with_retry::<String>(SHOW, json!({}), None)
            .await
            .unwrap_err();

        assert_eq!(command_message(&err), "Tunnel not found");
        assert_eq!(dispatcher.bridge().call_count(SHOW), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_exhausts_attempts_with_backoff() {
        let mock = MockBridge::new()
            .with_failure(SHOW, "timeout 1")
            .with_failure(SHOW, "timeout 2")
            .with_failure(SHOW, "timeout 3")
            .with_failure(SHOW, "timeout 4");
        let dispatcher = Dispatcher::new(mock);
        let started = Instant::now();

        let err = dispatcher
            .invoke_with_attempts::<String>(SHOW, json!({}), None, 4)
            .await
            .unwrap_err();

        // The final attempt's error propagates unchanged
        assert_eq!(command_message(&err), "timeout 4");

        let calls = dispatcher.bridge().call_instants(SHOW);
        assert_eq!(calls.len(), 4);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        // No sleep after the last attempt
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_is_three_attempts() {
        let mock = MockBridge::new().with_failure(SHOW, "backend busy");
        let dispatcher = Dispatcher::new(mock);

        let result = dispatcher
            .invoke_with_retry::<String>(SHOW, json!({}), None)
            .await;

        assert!(result.is_err());
        assert_eq!(dispatcher.bridge().call_count(SHOW), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failure() {
        let mock = MockBridge::new()
            .with_failure(SHOW, "connection reset")
            .with_success(SHOW, json!("ok"));
        let dispatcher = Dispatcher::new(mock);

        let text: String = dispatcher
            .invoke_with_retry(SHOW, json!({}), None)
            .await
            .unwrap();

        assert_eq!(text, "ok");
        assert_eq!(dispatcher.bridge().call_count(SHOW), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_after_transient_stops_immediately() {
        let mock = MockBridge::new()
            .with_failure(SHOW, "timeout")
            .with_failure(SHOW, "authentication required")
            .with_success(SHOW, json!("never reached"));
        let dispatcher = Dispatcher::new(mock);

        let err = dispatcher
            .invoke_with_retry::<String>(SHOW, json!({}), None)
            .await
            .unwrap_err();

        assert_eq!(command_message(&err), "authentication required");
        assert_eq!(dispatcher.bridge().call_count(SHOW), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_invokes_once() {
        let mock = MockBridge::new().with_failure(SHOW, "timeout");
        let dispatcher = Dispatcher::new(mock);

        let _ = dispatcher
            .invoke_with_attempts::<String>(SHOW, json!({}), None, 0)
            .await;
        assert_eq!(dispatcher.bridge().call_count(SHOW), 1);
    }

    #[test]
    fn test_delay_progression() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }
}
