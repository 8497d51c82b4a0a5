//! Audit trail for handled queries
//!
//! Every answered message leaves a `SessionTrace` with its classification,
//! steps and result, sealed with a content hash.

use crate::error::AssistantError;
use crate::models::{ClassificationResult, SessionTrace, TraceResult, TraceStep};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Audit trail storage
#[derive(Clone)]
pub struct AuditLog {
    records: Arc<RwLock<HashMap<Uuid, SessionTrace>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a trace; trace ids are never overwritten
    pub async fn record(&self, trace: SessionTrace) -> Result<Uuid> {
        let trace_id = trace.trace_id;
        let mut records = self.records.write().await;

        if records.contains_key(&trace_id) {
            return Err(AssistantError::AuditError(format!(
                "trace {} already recorded",
                trace_id
            )));
        }

        records.insert(trace_id, trace);
        Ok(trace_id)
    }

    pub async fn get(&self, trace_id: Uuid) -> Option<SessionTrace> {
        let records = self.records.read().await;
        records.get(&trace_id).cloned()
    }

    /// Trace ids for a session, oldest first
    pub async fn list_for_session(&self, session_id: Uuid) -> Vec<Uuid> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .values()
            .filter(|trace| trace.session_id == session_id)
            .map(|trace| (trace.trace_id, trace.timestamp))
            .collect();

        items.sort_by_key(|(_, timestamp)| *timestamp);

        items.into_iter().map(|(id, _)| id).collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Recompute the content hash and compare with the sealed one
    pub async fn verify_integrity(&self, trace_id: Uuid) -> bool {
        let records = self.records.read().await;

        match records.get(&trace_id) {
            Some(trace) => compute_trace_hash(trace) == trace.integrity_hash,
            None => false,
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashed view of a trace (everything but the hash itself)
#[derive(Serialize)]
struct HashedTrace<'a> {
    trace_id: Uuid,
    session_id: Uuid,
    user_id: &'a Option<String>,
    timestamp: DateTime<Utc>,
    query: &'a str,
    classification: &'a ClassificationResult,
    steps: &'a [TraceStep],
    total_duration_ms: f64,
    result: &'a TraceResult,
}

/// SHA-256 of a trace's content, hex encoded.
/// Streams JSON straight into the hasher.
pub fn compute_trace_hash(trace: &SessionTrace) -> String {
    let view = HashedTrace {
        trace_id: trace.trace_id,
        session_id: trace.session_id,
        user_id: &trace.user_id,
        timestamp: trace.timestamp,
        query: &trace.query,
        classification: &trace.classification,
        steps: &trace.steps,
        total_duration_ms: trace.total_duration_ms,
        result: &trace.result,
    };

    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), &view).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Fill in the integrity hash
pub fn seal(mut trace: SessionTrace) -> SessionTrace {
    trace.integrity_hash = compute_trace_hash(&trace);
    trace
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
