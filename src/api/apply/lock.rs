use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::adapters::LockGuard;
use crate::api::errors::{exit_code_for, id_str, ErrorId};
use crate::api::Materializer;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::policy::LockingPolicy;
use crate::types::errors::{Error, ErrorKind, Result};

pub(crate) struct LockInfo {
    pub backend: &'static str,
    pub wait_ms: Option<u64>,
    // held until the apply call returns
    pub _guard: Option<Box<dyn LockGuard>>,
}

pub(crate) fn acquire<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    slog: &StageLogger<'_>,
) -> Result<LockInfo> {
    let Some(mgr) = &api.lock else {
        if matches!(api.policy.locking, LockingPolicy::Required) {
            let err = Error::new(ErrorKind::Locking, "lock manager required by policy");
            emit_failure(slog, "none", None, &err);
            api.audit.log(Level::Error, "apply: no lock manager (E_LOCKING)");
            return Err(err);
        }
        slog.apply_attempt()
            .merge(&json!({ "lock_backend": "none", "no_lock_manager": true }))
            .emit_warn();
        return Ok(LockInfo { backend: "none", wait_ms: None, _guard: None });
    };

    let t0 = Instant::now();
    let res = mgr.acquire_process_lock(api.policy.lock_timeout_ms);
    let wait_ms = Some(u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX));
    match res {
        Ok(g) => Ok(LockInfo { backend: "process", wait_ms, _guard: Some(g) }),
        Err(e) => {
            emit_failure(slog, "process", wait_ms, &e);
            api.audit
                .log(Level::Error, "apply: lock acquisition failed (E_LOCKING)");
            Err(e)
        }
    }
}

fn emit_failure(slog: &StageLogger<'_>, backend: &str, wait_ms: Option<u64>, err: &Error) {
    let id = ErrorId::E_LOCKING;
    slog.apply_attempt()
        .merge(&json!({
            "lock_backend": backend,
            "lock_wait_ms": wait_ms,
            "error": err.to_string(),
            "error_id": id_str(id),
            "exit_code": exit_code_for(id),
        }))
        .emit_failure();
    slog.apply_result()
        .merge(&json!({
            "error_id": id_str(id),
            "exit_code": exit_code_for(id),
        }))
        .emit_failure();
}
