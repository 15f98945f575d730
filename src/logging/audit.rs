// Typed fact emission for apply runs.
//
// Every fact carries a minimal envelope: `schema_version`, `ts`, `run_id`, `path`,
// `decision`. Fields are plain JSON so sinks can forward them unchanged.
use serde_json::{json, Value};
use uuid::Uuid;

use crate::constants::SUBSYSTEM;
use crate::logging::{redact_event, FactsEmitter};

pub(crate) const SCHEMA_VERSION: i64 = 1;

pub(crate) fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub run_id: String,
    pub ts: String,
    pub redact: bool,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(facts: &'a dyn FactsEmitter, run_id: String, ts: String) -> Self {
        Self {
            facts,
            run_id,
            ts,
            redact: false,
        }
    }
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ApplyAttempt,
    ApplyResult,
    FileResult,
    FileSkipped,
    Rollback,
    BackupWarn,
    Fetch,
    Identity,
}

impl Stage {
    pub fn as_event(self) -> &'static str {
        match self {
            Stage::ApplyAttempt => "apply.attempt",
            Stage::ApplyResult => "apply.result",
            Stage::FileResult => "file.result",
            Stage::FileSkipped => "file.skipped",
            Stage::Rollback => "rollback",
            Stage::BackupWarn => "backup.warn",
            Stage::Fetch => "fetch",
            Stage::Identity => "identity",
        }
    }
}

/// Decision severity for audit events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with centralized envelope+redaction.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn stage(&self, stage: Stage) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, stage)
    }

    pub fn apply_attempt(&self) -> EventBuilder<'a> { self.stage(Stage::ApplyAttempt) }
    pub fn apply_result(&self) -> EventBuilder<'a> { self.stage(Stage::ApplyResult) }
    pub fn file_result(&self) -> EventBuilder<'a> { self.stage(Stage::FileResult) }
    pub fn file_skipped(&self) -> EventBuilder<'a> { self.stage(Stage::FileSkipped) }
    pub fn rollback(&self) -> EventBuilder<'a> { self.stage(Stage::Rollback) }
    pub fn backup_warn(&self) -> EventBuilder<'a> { self.stage(Stage::BackupWarn) }
    pub fn fetch(&self) -> EventBuilder<'a> { self.stage(Stage::Fetch) }
    pub fn identity(&self) -> EventBuilder<'a> { self.stage(Stage::Identity) }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.fields.insert("path".into(), json!(path.into()));
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn merge(mut self, extra: &Value) -> Self {
        if let Some(obj) = extra.as_object() {
            for (k, v) in obj {
                self.fields.insert(k.clone(), v.clone());
            }
        }
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = self.fields;
        fields.entry("decision").or_insert(json!(decision.as_str()));
        fields.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
        fields.entry("ts").or_insert(json!(self.ctx.ts));
        fields.entry("run_id").or_insert(json!(self.ctx.run_id));
        fields.entry("path").or_insert(json!(""));
        let out = if self.ctx.redact {
            redact_event(Value::Object(fields))
        } else {
            Value::Object(fields)
        };
        self.ctx
            .facts
            .emit(SUBSYSTEM, self.stage.as_event(), decision.as_str(), out);
    }

    pub fn emit_success(self) { self.emit(Decision::Success) }
    pub fn emit_failure(self) { self.emit(Decision::Failure) }
    pub fn emit_warn(self) { self.emit(Decision::Warn) }
}
