//! Group and user provisioning through the identity provider.
use std::collections::BTreeMap;

use log::Level;
use serde_json::json;

use crate::api::errors::{error_id_for, exit_code_for, id_str, ApiError};
use crate::api::Materializer;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::errors::Result;
use crate::types::{GroupSpec, UserSpec};

pub(crate) fn create_groups<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    groups: &BTreeMap<String, GroupSpec>,
) -> std::result::Result<Vec<String>, ApiError> {
    provision(api, "group", groups, |name, spec| {
        api.identity.create_group(name, spec.gid.as_deref())
    })
}

pub(crate) fn create_users<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    users: &BTreeMap<String, UserSpec>,
) -> std::result::Result<Vec<String>, ApiError> {
    provision(api, "user", users, |name, spec| {
        api.identity.create_or_modify_user(name, spec)
    })
}

/// Run `op` for every entry in name order, stopping at the first error.
/// Returns the names for which `op` reported a change.
fn provision<E, A, S, F>(
    api: &Materializer<E, A>,
    what: &str,
    specs: &BTreeMap<String, S>,
    mut op: F,
) -> std::result::Result<Vec<String>, ApiError>
where
    E: FactsEmitter,
    A: AuditSink,
    F: FnMut(&str, &S) -> Result<bool>,
{
    let mut changed = Vec::new();
    if specs.is_empty() {
        return Ok(changed);
    }
    let tctx = api.fresh_ctx();
    let slog = StageLogger::new(&tctx);
    for (name, spec) in specs {
        match op(name, spec) {
            Ok(did) => {
                slog.identity()
                    .merge(&json!({ "kind": what, "name": name, "changed": did }))
                    .emit_success();
                if did {
                    api.audit.log(Level::Info, &format!("{what} {name} provisioned"));
                    changed.push(name.clone());
                }
            }
            Err(e) => {
                let id = error_id_for(&e);
                slog.identity()
                    .merge(&json!({
                        "kind": what,
                        "name": name,
                        "error": e.to_string(),
                        "error_id": id_str(id),
                        "exit_code": exit_code_for(id),
                    }))
                    .emit_failure();
                api.audit.log(Level::Error, &format!("{what} {name}: {e}"));
                return Err(e.into());
            }
        }
    }
    Ok(changed)
}
