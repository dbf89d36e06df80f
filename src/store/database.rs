//! SQLite persistence for the visibility relation

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, QueryBuilder, Row, Sqlite, Transaction,
};
use std::str::FromStr;

use crate::graph::VisibilityGraph;
use crate::model::{Envelope, Link, LinkRelationship, UploadMeta};
use crate::progress::Progress;

use super::SCHEMA_VERSION;

/// Rows per multi-row INSERT, kept well under SQLite's bind variable cap
const INSERT_CHUNK: usize = 500;

/// SQLite-backed store for the visibility relation
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database at `db_path`, creating the file if missing.
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Visibility is replaced one repository at a time, so a single
        // connection suffices and keeps SQLite's writer lock uncontended.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {db_path}"))?;

        Ok(Self { pool })
    }

    /// Ensure the tables exist and carry the current schema version. On a
    /// version mismatch every table is dropped and recreated; returns
    /// whether that rebuild happened.
    pub async fn init_schema(&self) -> Result<bool> {
        // The version row lives in metadata, so that table has to exist
        // before anything can be checked against it.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        if self.get_metadata("schema_version").await.as_deref() == Some(SCHEMA_VERSION) {
            return Ok(false);
        }

        for query in [
            "DROP TABLE IF EXISTS nearest_uploads",
            "DROP TABLE IF EXISTS nearest_uploads_links",
            "DROP TABLE IF EXISTS uploads_visible_at_tip",
            "DROP TABLE IF EXISTS dirty_repositories",
        ] {
            sqlx::query(query).execute(&self.pool).await?;
        }

        for query in [
            "CREATE TABLE nearest_uploads (
                repository_id INTEGER NOT NULL,
                commit_hash TEXT NOT NULL,
                upload_id INTEGER NOT NULL,
                distance INTEGER NOT NULL
            )",
            "CREATE INDEX idx_nearest_uploads_commit
                ON nearest_uploads (repository_id, commit_hash)",
            "CREATE TABLE nearest_uploads_links (
                repository_id INTEGER NOT NULL,
                commit_hash TEXT NOT NULL,
                ancestor_commit TEXT,
                ancestor_distance INTEGER NOT NULL,
                descendant_commit TEXT,
                descendant_distance INTEGER NOT NULL
            )",
            "CREATE INDEX idx_nearest_uploads_links_commit
                ON nearest_uploads_links (repository_id, commit_hash)",
            "CREATE TABLE uploads_visible_at_tip (
                repository_id INTEGER NOT NULL,
                upload_id INTEGER NOT NULL
            )",
            "CREATE INDEX idx_uploads_visible_at_tip_repository
                ON uploads_visible_at_tip (repository_id)",
            "CREATE TABLE dirty_repositories (
                repository_id INTEGER PRIMARY KEY,
                dirty_token INTEGER NOT NULL,
                update_token INTEGER NOT NULL
            )",
        ] {
            sqlx::query(query).execute(&self.pool).await?;
        }

        self.set_metadata("schema_version", SCHEMA_VERSION).await?;
        Ok(true)
    }

    /// The stored value for a metadata key, if the key is present
    pub async fn get_metadata(&self, key: &str) -> Option<String> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .ok()??;
        row.try_get("value").ok()
    }

    /// Upsert a metadata key
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop all visibility rows for a repository
    pub async fn clear_visibility(&self, repository_id: i64) -> Result<()> {
        for query in [
            "DELETE FROM nearest_uploads WHERE repository_id = ?",
            "DELETE FROM nearest_uploads_links WHERE repository_id = ?",
            "DELETE FROM uploads_visible_at_tip WHERE repository_id = ?",
        ] {
            sqlx::query(query)
                .bind(repository_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Save nearest-upload rows for one commit
    pub async fn save_nearest_uploads(
        &self,
        repository_id: i64,
        commit: &str,
        uploads: &[UploadMeta],
    ) -> Result<()> {
        if uploads.is_empty() {
            return Ok(());
        }

        let mut rows: Vec<(&str, i64, i64)> = uploads
            .iter()
            .map(|upload| (commit, upload.upload_id, upload.flags as i64))
            .collect();

        let mut tx = self.pool.begin().await?;
        Self::flush_nearest_uploads(&mut tx, repository_id, &mut rows).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Save the link row for one commit
    pub async fn save_upload_links(
        &self,
        repository_id: i64,
        link: &LinkRelationship<'_>,
    ) -> Result<()> {
        let mut rows = vec![link.clone()];

        let mut tx = self.pool.begin().await?;
        Self::flush_upload_links(&mut tx, repository_id, &mut rows).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Save the uploads visible from the tip of the default branch
    pub async fn save_uploads_visible_at_tip(
        &self,
        repository_id: i64,
        uploads: &[UploadMeta],
    ) -> Result<()> {
        if uploads.is_empty() {
            return Ok(());
        }

        let mut rows: Vec<i64> = uploads.iter().map(|upload| upload.upload_id).collect();

        let mut tx = self.pool.begin().await?;
        Self::flush_visible_at_tip(&mut tx, repository_id, &mut rows).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Flag a repository's visibility data as out of date
    pub async fn mark_dirty(&self, repository_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO dirty_repositories (repository_id, dirty_token, update_token)
             VALUES (?, 1, 0)
             ON CONFLICT (repository_id) DO UPDATE SET dirty_token = dirty_token + 1",
        )
        .bind(repository_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Repositories whose dirty token is ahead of their update token
    pub async fn dirty_repositories(&self) -> Result<FxHashMap<i64, i64>> {
        let rows = sqlx::query(
            "SELECT repository_id, dirty_token FROM dirty_repositories
             WHERE dirty_token > update_token",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("repository_id"), row.get("dirty_token")))
            .collect())
    }

    /// Raise a repository's update token; never lowers it
    pub async fn unmark_dirty(&self, repository_id: i64, token: i64) -> Result<()> {
        sqlx::query(
            "UPDATE dirty_repositories SET update_token = MAX(update_token, ?)
             WHERE repository_id = ?",
        )
        .bind(token)
        .bind(repository_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load the nearest-upload rows for a commit, ordered by upload id
    pub async fn load_nearest_uploads(
        &self,
        repository_id: i64,
        commit: &str,
    ) -> Result<Vec<UploadMeta>> {
        let rows = sqlx::query(
            "SELECT upload_id, distance FROM nearest_uploads
             WHERE repository_id = ? AND commit_hash = ?
             ORDER BY upload_id",
        )
        .bind(repository_id)
        .bind(commit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| UploadMeta {
                upload_id: row.get("upload_id"),
                flags: row.get::<i64, _>("distance") as u32,
            })
            .collect())
    }

    /// Load the link row for a commit, if one was written
    pub async fn load_upload_links(
        &self,
        repository_id: i64,
        commit: &str,
    ) -> Result<Option<Link>> {
        let row = sqlx::query(
            "SELECT ancestor_commit, ancestor_distance, descendant_commit, descendant_distance
             FROM nearest_uploads_links
             WHERE repository_id = ? AND commit_hash = ?",
        )
        .bind(repository_id)
        .bind(commit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Link {
            ancestor: row.get("ancestor_commit"),
            ancestor_distance: row.get::<i64, _>("ancestor_distance") as u32,
            descendant: row.get("descendant_commit"),
            descendant_distance: row.get::<i64, _>("descendant_distance") as u32,
        }))
    }

    /// Load the upload ids visible from the tip of the default branch
    pub async fn load_uploads_visible_at_tip(&self, repository_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT upload_id FROM uploads_visible_at_tip
             WHERE repository_id = ?
             ORDER BY upload_id",
        )
        .bind(repository_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("upload_id")).collect())
    }

    /// Whether either visibility table knows the given commit
    pub async fn has_commit(&self, repository_id: i64, commit: &str) -> Result<bool> {
        let count: i64 = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM nearest_uploads
                    WHERE repository_id = ?1 AND commit_hash = ?2)
              + (SELECT COUNT(*) FROM nearest_uploads_links
                    WHERE repository_id = ?1 AND commit_hash = ?2)
              AS total",
        )
        .bind(repository_id)
        .bind(commit)
        .fetch_one(&self.pool)
        .await?
        .get("total");

        Ok(count > 0)
    }

    /// Replace a repository's visibility data in a single transaction:
    /// clear the old rows, drain the graph's stream into batched inserts,
    /// write the visible-at-tip set, and settle the dirty token.
    pub async fn replace_visibility(
        &self,
        repository_id: i64,
        graph: &VisibilityGraph<'_>,
        tip_commit: &str,
        dirty_token: i64,
        progress: Progress,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin visibility transaction")?;

        for query in [
            "DELETE FROM nearest_uploads WHERE repository_id = ?",
            "DELETE FROM nearest_uploads_links WHERE repository_id = ?",
            "DELETE FROM uploads_visible_at_tip WHERE repository_id = ?",
        ] {
            sqlx::query(query)
                .bind(repository_id)
                .execute(&mut *tx)
                .await?;
        }

        let task = progress.start_replace(repository_id, graph.commits().order().len() as u64);
        let mut upload_rows: Vec<(&str, i64, i64)> = Vec::new();
        let mut link_rows: Vec<LinkRelationship<'_>> = Vec::new();

        for envelope in graph.stream() {
            match envelope {
                Envelope::Uploads(relationship) => {
                    for upload in &relationship.uploads {
                        upload_rows.push((
                            relationship.commit,
                            upload.upload_id,
                            upload.flags as i64,
                        ));
                    }
                    if upload_rows.len() >= INSERT_CHUNK {
                        Self::flush_nearest_uploads(&mut tx, repository_id, &mut upload_rows)
                            .await?;
                    }
                }
                Envelope::Links(relationship) => {
                    link_rows.push(relationship);
                    if link_rows.len() >= INSERT_CHUNK {
                        Self::flush_upload_links(&mut tx, repository_id, &mut link_rows).await?;
                    }
                }
            }
            task.envelope_written();
        }

        Self::flush_nearest_uploads(&mut tx, repository_id, &mut upload_rows).await?;
        Self::flush_upload_links(&mut tx, repository_id, &mut link_rows).await?;
        task.finish();

        let mut tip_rows: Vec<i64> = graph
            .uploads_visible_at(tip_commit)
            .iter()
            .map(|upload| upload.upload_id)
            .collect();
        Self::flush_visible_at_tip(&mut tx, repository_id, &mut tip_rows).await?;

        if dirty_token != 0 {
            sqlx::query(
                "UPDATE dirty_repositories SET update_token = MAX(update_token, ?)
                 WHERE repository_id = ?",
            )
            .bind(dirty_token)
            .bind(repository_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.context("Failed to commit visibility")?;
        Ok(())
    }

    async fn flush_nearest_uploads(
        tx: &mut Transaction<'static, Sqlite>,
        repository_id: i64,
        rows: &mut Vec<(&str, i64, i64)>,
    ) -> Result<()> {
        while !rows.is_empty() {
            let chunk = rows.len().min(INSERT_CHUNK);
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO nearest_uploads (repository_id, commit_hash, upload_id, distance) ",
            );
            builder.push_values(rows.drain(..chunk), |mut b, (commit, upload_id, distance)| {
                b.push_bind(repository_id)
                    .push_bind(commit)
                    .push_bind(upload_id)
                    .push_bind(distance);
            });
            builder.build().execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn flush_upload_links(
        tx: &mut Transaction<'static, Sqlite>,
        repository_id: i64,
        rows: &mut Vec<LinkRelationship<'_>>,
    ) -> Result<()> {
        while !rows.is_empty() {
            let chunk = rows.len().min(INSERT_CHUNK);
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO nearest_uploads_links (repository_id, commit_hash, \
                 ancestor_commit, ancestor_distance, descendant_commit, descendant_distance) ",
            );
            builder.push_values(rows.drain(..chunk), |mut b, link| {
                b.push_bind(repository_id)
                    .push_bind(link.commit)
                    .push_bind(link.ancestor)
                    .push_bind(link.ancestor_distance as i64)
                    .push_bind(link.descendant)
                    .push_bind(link.descendant_distance as i64);
            });
            builder.build().execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn flush_visible_at_tip(
        tx: &mut Transaction<'static, Sqlite>,
        repository_id: i64,
        rows: &mut Vec<i64>,
    ) -> Result<()> {
        while !rows.is_empty() {
            let chunk = rows.len().min(INSERT_CHUNK);
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO uploads_visible_at_tip (repository_id, upload_id) ",
            );
            builder.push_values(rows.drain(..chunk), |mut b, upload_id| {
                b.push_bind(repository_id).push_bind(upload_id);
            });
            builder.build().execute(&mut **tx).await?;
        }
        Ok(())
    }
}
