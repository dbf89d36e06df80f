//! Upload index input
//!
//! Accumulates the uploads anchored at each commit along with the token
//! (the root + indexer equivalence class) each upload competes under.
//! Built once per recomputation by the caller from persistent upload state.

use rustc_hash::FxHashMap;

use crate::model::UploadMeta;

#[derive(Default)]
pub struct CommitGraphView {
    meta: FxHashMap<String, Vec<UploadMeta>>,
    tokens: FxHashMap<i64, String>,
}

impl CommitGraphView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an upload anchored at `commit`. Every upload id recorded here
    /// is also present in the token mapping; calling this twice with the
    /// same upload id keeps the last token.
    pub fn add(&mut self, meta: UploadMeta, commit: &str, token: &str) {
        self.meta.entry(commit.to_string()).or_default().push(meta);
        self.tokens.insert(meta.upload_id, token.to_string());
    }

    /// Uploads anchored at each commit
    pub fn meta(&self) -> &FxHashMap<String, Vec<UploadMeta>> {
        &self.meta
    }

    /// Token for each known upload id
    pub fn tokens(&self) -> &FxHashMap<i64, String> {
        &self.tokens
    }
}
