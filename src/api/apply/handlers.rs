use std::path::Path;

use log::Level;
use serde_json::json;

use crate::api::errors::{error_id_for, exit_code_for, id_str};
use crate::api::Materializer;
use crate::content::{write_content, Origin};
use crate::fs::atomic::parent_of;
use crate::fs::meta::{kind_of, resolve_link_dest, same_file, sha256_hex_of};
use crate::fs::{set_mode, transact, write_file_with, write_symlink};
use crate::logging::{redact_url, AuditSink, FactsEmitter, StageLogger};
use crate::types::errors::{Error, Result};
use crate::types::{AuthConfig, FileEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Changed,
    Unchanged,
    Skipped,
}

/// Converge one entry and emit its per-path facts.
pub(crate) fn handle_entry<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    slog: &StageLogger<'_>,
    key: &str,
    entry: &FileEntry,
    auth: &AuthConfig,
) -> Result<Outcome> {
    let path = api.resolve(key)?;

    if entry.is_symlink() {
        let dest = entry.link_target()?;
        if same_file(&path, &resolve_link_dest(&path, Path::new(dest))) {
            slog.file_skipped()
                .path(key)
                .field("link_target", json!(dest))
                .emit_success();
            api.audit
                .log(Level::Debug, &format!("{key} already links to {dest}"));
            return Ok(Outcome::Skipped);
        }
    }

    ensure_parent(&path)?;
    let durable = api.policy.durability;
    let before_kind = kind_of(&path);

    let mut warnings: Vec<String> = Vec::new();
    let mut origin: Option<Origin> = None;
    let res = transact(
        &path,
        durable,
        |w| warnings.push(w),
        |p: &Path| {
            if entry.is_symlink() {
                write_symlink(p, entry.link_target()?, durable)?;
            } else {
                write_file_with(p, durable, |w| {
                    origin = Some(write_content(entry, w, api.transport.as_ref(), auth)?);
                    Ok(())
                })?;
            }
            if let Some(mode) = entry.mode.filter(|m| !m.is_symlink()) {
                set_mode(p, mode.permissions())?;
            }
            if entry.owner.is_some() || entry.group.is_some() {
                api.identity
                    .set_owner_and_group(p, entry.owner.as_deref(), entry.group.as_deref())?;
            }
            Ok(())
        },
    );

    if let (Some(Origin::Remote { gzip }), Some(url)) = (origin, entry.source.as_deref()) {
        slog.fetch()
            .path(key)
            .merge(&json!({ "url": redact_url(url), "gzip": gzip }))
            .emit_success();
    }

    match res {
        Ok(changed) => {
            report_warnings(api, slog, key, &warnings);
            slog.file_result()
                .path(key)
                .merge(&json!({
                    "changed": changed,
                    "before_kind": before_kind,
                    "after_kind": kind_of(&path),
                    "sha256": sha256_hex_of(&path),
                    "origin": origin.map(Origin::as_str),
                    "mode": entry.mode.map(|m| m.to_string()),
                }))
                .emit_success();
            Ok(if changed { Outcome::Changed } else { Outcome::Unchanged })
        }
        Err(e) => {
            let restored = warnings.is_empty();
            report_warnings(api, slog, key, &warnings);
            let rb = slog
                .rollback()
                .path(key)
                .field("restored_kind", json!(kind_of(&path)));
            if restored {
                rb.emit_success();
            } else {
                rb.emit_warn();
            }
            let id = error_id_for(&e);
            slog.file_result()
                .path(key)
                .merge(&json!({
                    "before_kind": before_kind,
                    "error": e.to_string(),
                    "error_id": id_str(id),
                    "exit_code": exit_code_for(id),
                }))
                .emit_failure();
            Err(e)
        }
    }
}

fn report_warnings<E: FactsEmitter, A: AuditSink>(
    api: &Materializer<E, A>,
    slog: &StageLogger<'_>,
    key: &str,
    warnings: &[String],
) {
    for w in warnings {
        api.audit.log(Level::Warn, &format!("{key}: {w}"));
        slog.backup_warn().path(key).field("warning", json!(w)).emit_warn();
    }
}

/// Create missing ancestors of `path`. A non-directory in the way is a
/// configuration error.
fn ensure_parent(path: &Path) -> Result<()> {
    let parent = parent_of(path);
    let not_a_dir = || Error::config(format!("{}: parent exists and is not a directory", parent.display()));
    match std::fs::metadata(parent) {
        Ok(md) if md.is_dir() => Ok(()),
        Ok(_) => Err(not_a_dir()),
        Err(e) if e.raw_os_error() == Some(libc::ENOTDIR) => Err(not_a_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("creating parent directory {}", parent.display());
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("could not create {}", parent.display()), &e))
        }
        Err(e) => Err(Error::io(format!("could not inspect {}", parent.display()), &e)),
    }
}
