/// Outcome of one `Materializer::apply` call.
#[derive(Clone, Debug, Default)]
pub struct ApplyReport {
    /// Path keys whose committed content differs from before the call, in
    /// ascending lexicographic order.
    pub changed: Vec<String>,
    /// Symlink entries that already pointed at their target.
    pub skipped: Vec<String>,
    pub duration_ms: u64,
    pub run_id: String,
}
