use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Strip userinfo from a URL so credentials never reach a sink.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}

/// Apply redactions to a fact event for comparison and safe logging.
/// Zeroes timestamps, drops timings and the run id, and masks credentials.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        obj.remove("duration_ms");
        obj.remove("run_id");
        if obj.contains_key("authentication") {
            obj.insert("authentication".into(), Value::String("***".into()));
        }
        if let Some(url) = obj.get("url").and_then(Value::as_str) {
            let masked = redact_url(url);
            obj.insert("url".into(), Value::String(masked));
        }
    }
    v
}
