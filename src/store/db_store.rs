//! `VisibilityStore` backed by the SQLite database

use anyhow::Result;
use rustc_hash::FxHashMap;

use crate::graph::VisibilityGraph;
use crate::model::{LinkRelationship, UploadMeta};
use crate::progress::Progress;

use super::database::Database;
use super::store::VisibilityStore;

impl VisibilityStore for Database {
    async fn clear_visibility(&self, repository_id: i64) -> Result<()> {
        Database::clear_visibility(self, repository_id).await
    }

    async fn save_nearest_uploads(
        &self,
        repository_id: i64,
        commit: &str,
        uploads: &[UploadMeta],
    ) -> Result<()> {
        Database::save_nearest_uploads(self, repository_id, commit, uploads).await
    }

    async fn save_upload_links(
        &self,
        repository_id: i64,
        link: &LinkRelationship<'_>,
    ) -> Result<()> {
        Database::save_upload_links(self, repository_id, link).await
    }

    async fn save_uploads_visible_at_tip(
        &self,
        repository_id: i64,
        uploads: &[UploadMeta],
    ) -> Result<()> {
        Database::save_uploads_visible_at_tip(self, repository_id, uploads).await
    }

    async fn mark_dirty(&self, repository_id: i64) -> Result<()> {
        Database::mark_dirty(self, repository_id).await
    }

    async fn dirty_repositories(&self) -> Result<FxHashMap<i64, i64>> {
        Database::dirty_repositories(self).await
    }

    async fn unmark_dirty(&self, repository_id: i64, token: i64) -> Result<()> {
        Database::unmark_dirty(self, repository_id, token).await
    }

    /// Runs the whole replacement in one transaction, unlike the default.
    async fn apply_visibility(
        &self,
        repository_id: i64,
        graph: &VisibilityGraph<'_>,
        tip_commit: &str,
        dirty_token: i64,
        progress: Progress,
    ) -> Result<()> {
        self.replace_visibility(repository_id, graph, tip_commit, dirty_token, progress)
            .await
    }
}
