//! Shared helpers for the orchestration integration tests

#![allow(dead_code)]

use cladeflow::{AnalysisEvent, AnalysisOptions, AutodetectEvent, GlobalStatus};
use cladeflow_core::PoolConfig;
use tokio::sync::mpsc;

pub fn options(units: usize, max_pending_tasks: usize) -> AnalysisOptions {
    AnalysisOptions {
        pool: pool_config(units),
        max_pending_tasks,
    }
}

pub fn pool_config(units: usize) -> PoolConfig {
    PoolConfig {
        units,
        concurrency_per_unit: 1,
        init_timeout_secs: 5,
    }
}

/// Drain a closed event channel
pub async fn drain<T>(mut rx: mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn statuses(events: &[AnalysisEvent]) -> Vec<GlobalStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::GlobalStatus(s) => Some(*s),
            _ => None,
        })
        .collect()
}

pub fn result_indices(events: &[AnalysisEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::Result(r) => Some(r.index),
            _ => None,
        })
        .collect()
}

pub fn autodetect_statuses(events: &[AutodetectEvent]) -> Vec<GlobalStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            AutodetectEvent::GlobalStatus(s) => Some(*s),
            _ => None,
        })
        .collect()
}
