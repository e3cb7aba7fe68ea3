//! Demo engine served by the gateway binary.
//!
//! Queries are echoed back; subscriptions emit a monotonically increasing
//! tick at a fixed interval. Useful for exercising both transports without
//! a real schema behind them.

use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::{FutureExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ExecutionEngine, ExecutionResult, GraphQLRequest};

/// Message reported for requests without a query document.
pub const MISSING_OPERATION: &str = "Must provide an operation.";

/// Shortest tick interval; a zero period is not a valid tokio interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Echo/tick engine.
#[derive(Debug, Clone)]
pub struct TickerEngine {
    interval: Duration,
}

impl TickerEngine {
    /// Creates an engine ticking at the given interval.
    ///
    /// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
        }
    }
}

impl ExecutionEngine for TickerEngine {
    fn execute(
        &self,
        request: GraphQLRequest,
    ) -> futures_util::future::BoxFuture<'static, ExecutionResult> {
        let result = if request.is_blank() {
            ExecutionResult::from_error(MISSING_OPERATION)
        } else {
            let mut echo = json!({
                "query": request.query,
                "variables": request.variables,
                "operationName": request.operation_name,
            });
            if let (Some(fields), Some(root)) = (echo.as_object_mut(), request.root_value) {
                fields.insert("root".to_string(), Value::Object(root));
            }
            ExecutionResult::from_data(json!({ "echo": echo }))
        };
        std::future::ready(result).boxed()
    }

    fn subscribe(
        &self,
        request: GraphQLRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ExecutionResult> {
        if request.is_blank() {
            return stream::once(std::future::ready(ExecutionResult::from_error(
                MISSING_OPERATION,
            )))
            .boxed();
        }

        // `limit` bounds the stream; without it ticks run until cancelled.
        let limit = request
            .variable("limit")
            .and_then(serde_json::Value::as_u64);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        stream::unfold(
            (ticker, 0_u64, cancel),
            move |(mut ticker, seq, cancel): (Interval, u64, CancellationToken)| async move {
                if limit.is_some_and(|max| seq >= max) {
                    return None;
                }
                tokio::select! {
                    () = cancel.cancelled() => None,
                    _ = ticker.tick() => {
                        let item = ExecutionResult::from_data(json!({ "tick": seq }));
                        Some((item, (ticker, seq + 1, cancel)))
                    }
                }
            },
        )
        .boxed()
    }
}
