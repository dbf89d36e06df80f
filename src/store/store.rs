//! Persistence contract for the computed relation
//!
//! Stores receive the stream one row shape at a time, which keeps the
//! engine free of SQL and lets tests swap in a map-backed store.

use anyhow::Result;
use rustc_hash::FxHashMap;

use crate::graph::VisibilityGraph;
use crate::model::{Envelope, LinkRelationship, UploadMeta};
use crate::progress::Progress;

/// Persistence layer for the computed visibility relation.
///
/// Two row shapes are written per repository: nearest-upload rows for
/// commits whose full upload set is materialized, and link rows for
/// commits reconstructible from their nearest seed commits. A third set
/// records the uploads visible from the tip of the default branch.
#[allow(async_fn_in_trait)]
pub trait VisibilityStore {
    /// Drop all visibility rows for a repository
    async fn clear_visibility(&self, repository_id: i64) -> Result<()>;

    /// Save one row per upload visible at a fully materialized commit.
    /// The distance column stores the packed flags value bit-for-bit.
    async fn save_nearest_uploads(
        &self,
        repository_id: i64,
        commit: &str,
        uploads: &[UploadMeta],
    ) -> Result<()>;

    /// Save one row for a link commit pointing at its nearest seed commits
    async fn save_upload_links(
        &self,
        repository_id: i64,
        link: &LinkRelationship<'_>,
    ) -> Result<()>;

    /// Save the upload ids visible from the tip of the default branch
    async fn save_uploads_visible_at_tip(
        &self,
        repository_id: i64,
        uploads: &[UploadMeta],
    ) -> Result<()>;

    /// Flag a repository's visibility data as out of date
    async fn mark_dirty(&self, repository_id: i64) -> Result<()>;

    /// Repositories whose dirty token is ahead of their update token,
    /// mapped to the dirty token a recomputation should settle
    async fn dirty_repositories(&self) -> Result<FxHashMap<i64, i64>>;

    /// Raise a repository's update token to `token`. The token never
    /// decreases, so a mark that raced in during recomputation keeps the
    /// repository dirty.
    async fn unmark_dirty(&self, repository_id: i64, token: i64) -> Result<()>;

    /// Replace a repository's visibility data with the given graph's
    /// output, then settle the dirty token (zero leaves the flag alone).
    ///
    /// This default is NOT atomic: rows are cleared and written in
    /// separate statements. Database-backed stores should override this
    /// to run in one transaction.
    async fn apply_visibility(
        &self,
        repository_id: i64,
        graph: &VisibilityGraph<'_>,
        tip_commit: &str,
        dirty_token: i64,
        progress: Progress,
    ) -> Result<()> {
        self.clear_visibility(repository_id).await?;

        let task = progress.start_replace(repository_id, graph.commits().order().len() as u64);
        for envelope in graph.stream() {
            match envelope {
                Envelope::Uploads(relationship) => {
                    self.save_nearest_uploads(
                        repository_id,
                        relationship.commit,
                        &relationship.uploads,
                    )
                    .await?;
                }
                Envelope::Links(relationship) => {
                    self.save_upload_links(repository_id, &relationship).await?;
                }
            }
            task.envelope_written();
        }
        task.finish();

        self.save_uploads_visible_at_tip(repository_id, &graph.uploads_visible_at(tip_commit))
            .await?;

        if dirty_token != 0 {
            self.unmark_dirty(repository_id, dirty_token).await?;
        }

        Ok(())
    }
}
