//! Apply stage: converges each desired-state entry inside a backup transaction.
//!
//! Side-effects:
//! - Emits `apply.attempt` and `apply.result` facts per run, and `file.result`,
//!   `file.skipped`, `fetch`, `backup.warn` and `rollback` facts per path.
//! - Enforces the locking policy before any path is touched.
//! - Stops at the first failing entry; earlier commits stand.

use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::api::errors::{error_id_for, exit_code_for, id_str, ApiError};
use crate::api::Materializer;
use crate::logging::audit::new_run_id;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{ApplyReport, AuthConfig, DesiredState};

mod handlers;
mod lock;

use handlers::Outcome;

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    state: &DesiredState,
    auth: &AuthConfig,
) -> Result<ApplyReport, ApiError> {
    let t0 = Instant::now();
    let run_id = new_run_id();
    let mut report = ApplyReport {
        run_id: run_id.clone(),
        ..ApplyReport::default()
    };
    if state.is_empty() {
        api.audit.log(Level::Debug, "apply: empty desired state");
        return Ok(report);
    }

    let tctx = api.audit_ctx(run_id);
    let slog = StageLogger::new(&tctx);

    api.audit.log(Level::Info, "apply: starting");
    let linfo = lock::acquire(api, &slog)?;
    slog.apply_attempt()
        .merge(&json!({
            "entries": state.len(),
            "lock_backend": linfo.backend,
            "lock_wait_ms": linfo.wait_ms,
        }))
        .emit_success();

    // BTreeMap iteration gives ascending key order.
    for (key, entry) in state.iter() {
        match handlers::handle_entry(api, &slog, key, entry, auth) {
            Ok(Outcome::Changed) => report.changed.push(key.clone()),
            Ok(Outcome::Unchanged) => {}
            Ok(Outcome::Skipped) => report.skipped.push(key.clone()),
            Err(e) => {
                let id = error_id_for(&e);
                slog.apply_result()
                    .path(key.as_str())
                    .merge(&json!({
                        "changed": report.changed,
                        "skipped": report.skipped,
                        "duration_ms": elapsed_ms(t0),
                        "error": e.to_string(),
                        "error_id": id_str(id),
                        "exit_code": exit_code_for(id),
                    }))
                    .emit_failure();
                api.audit.log(Level::Error, &format!("apply: {key}: {e}"));
                return Err(e.into());
            }
        }
    }

    report.duration_ms = elapsed_ms(t0);
    slog.apply_result()
        .merge(&json!({
            "changed": report.changed,
            "skipped": report.skipped,
            "duration_ms": report.duration_ms,
        }))
        .emit_success();
    api.audit.log(
        Level::Info,
        &format!("apply: finished, {} changed", report.changed.len()),
    );
    Ok(report)
}

fn elapsed_ms(t0: Instant) -> u64 {
    u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX)
}
