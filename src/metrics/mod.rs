/*!
 * # Metrics Module
 *
 * Prometheus counters for the stock engine, registered in a crate-local
 * registry and rendered in the Prometheus text exposition format.
 *
 * - `inventory_stock_movements_total{movement_type}`: ledger rows written
 * - `inventory_operation_failures_total{operation}`: failed operations
 * - `inventory_conflict_retries_total{operation}`: optimistic-concurrency retries
 * - `inventory_stock_sync_failures_total`: catalog mirror writes that failed
 */

use crate::errors::ServiceError;
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref STOCK_MOVEMENTS: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_stock_movements_total",
                "Total number of stock movements appended to the ledger"
            ),
            &["movement_type"]
        )
        .expect("metric can be created")
    );
    pub static ref OPERATION_FAILURES: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_operation_failures_total",
                "Total number of failed inventory operations"
            ),
            &["operation"]
        )
        .expect("metric can be created")
    );
    pub static ref CONFLICT_RETRIES: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_conflict_retries_total",
                "Total number of retries after a concurrent balance update"
            ),
            &["operation"]
        )
        .expect("metric can be created")
    );
    pub static ref STOCK_SYNC_FAILURES: IntCounter = register(
        IntCounter::new(
            "inventory_stock_sync_failures_total",
            "Total number of failed catalog stock mirror writes"
        )
        .expect("metric can be created")
    );
}

fn register<C>(collector: C) -> C
where
    C: Collector + Clone + 'static,
{
    if let Err(err) = REGISTRY.register(Box::new(collector.clone())) {
        warn!("Failed to register metric: {}", err);
    }
    collector
}

pub fn record_movement(movement_type: &str) {
    STOCK_MOVEMENTS.with_label_values(&[movement_type]).inc();
}

pub fn record_failure(operation: &str) {
    OPERATION_FAILURES.with_label_values(&[operation]).inc();
}

pub fn record_conflict_retry(operation: &str) {
    CONFLICT_RETRIES.with_label_values(&[operation]).inc();
}

pub fn record_sync_failure() {
    STOCK_SYNC_FAILURES.inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather_text() -> Result<String, ServiceError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("Metrics are not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_movements_show_up_in_text_output() {
        record_movement("TRANSFER");
        record_failure("stock_out");
        let text = gather_text().unwrap();
        assert!(text.contains("inventory_stock_movements_total"));
        assert!(text.contains("movement_type=\"TRANSFER\""));
        assert!(text.contains("operation=\"stock_out\""));
    }
}
