//! Commit-graph visibility engine
//!
//! Decorates a repository's commit graph with the set of code-intelligence
//! uploads visible from every commit, resolved per token to the nearest
//! upload along ancestor or descendant paths.
//!
//! # Architecture
//!
//! The engine is organized into layers:
//!
//! - **interner**: Commit and token interning for compact graph storage
//! - **input**: Parsed commit DAG in `git log --topo-order` format
//! - **view**: Per-commit anchored uploads and the upload-to-token mapping
//! - **reverse**: Transposed adjacency for the descendant traversal
//! - **populate**: Seed-commit selection and per-token nearest-upload maps
//! - **resolve**: First-parent seed walks and ancestor/descendant merging
//! - **stream**: Lazy envelope emission, one per inhabited commit

mod input;
mod interner;
mod populate;
mod resolve;
mod reverse;
mod stream;
mod view;

pub use input::CommitGraph;
pub use interner::{CommitId, CommitInterner};
pub use stream::EnvelopeStream;
pub use view::CommitGraphView;

use rustc_hash::FxHashMap;

use crate::model::{Envelope, Link, UploadMeta};

use interner::{TokenId, TokenInterner};
use populate::{populate_uploads_by_traversal, SeedMap};
use resolve::{combine_visible_uploads, traverse_for_commit};

/// A commit graph decorated with the uploads visible from each commit.
///
/// Construction runs both seed passes up front; afterwards the value is
/// immutable and queries only read the precomputed seed maps. The engine
/// performs no I/O and holds no state beyond one recomputation.
pub struct VisibilityGraph<'g> {
    commits: &'g CommitGraph,
    children: Vec<Vec<CommitId>>,
    ancestor_uploads: Vec<Option<SeedMap>>,
    descendant_uploads: Vec<Option<SeedMap>>,
}

impl<'g> VisibilityGraph<'g> {
    /// Decorate `commits` with the uploads recorded in `view`. Uploads
    /// anchored at commits the graph does not contain are unreachable by
    /// any traversal and are dropped.
    pub fn new(commits: &'g CommitGraph, view: &CommitGraphView) -> Self {
        let children = reverse::reverse_graph(commits.parents());

        let mut tokens = TokenInterner::default();
        let mut meta: Vec<Vec<(TokenId, UploadMeta)>> = vec![Vec::new(); commits.len()];
        for (commit, uploads) in view.meta() {
            let Some(commit) = commits.lookup(commit) else {
                continue;
            };
            for upload in uploads {
                // The view keeps a token for every upload id it records.
                let token = &view.tokens()[&upload.upload_id];
                meta[commit.index()].push((tokens.intern(token), *upload));
            }
        }

        let ancestor_uploads = populate_uploads_by_traversal(
            commits.parents(),
            &children,
            commits.order(),
            &meta,
            false,
        );
        let descendant_uploads = populate_uploads_by_traversal(
            &children,
            commits.parents(),
            commits.order(),
            &meta,
            true,
        );

        Self {
            commits,
            children,
            ancestor_uploads,
            descendant_uploads,
        }
    }

    /// The underlying commit graph
    pub fn commits(&self) -> &'g CommitGraph {
        self.commits
    }

    /// The set of uploads visible from the given commit, resolved without
    /// streaming the whole graph. Unknown commits see nothing.
    pub fn uploads_visible_at(&self, commit: &str) -> Vec<UploadMeta> {
        let Some(commit) = self.commits.lookup(commit) else {
            return Vec::new();
        };

        let ancestor = self.nearest_ancestor_seed(commit);
        let descendant = self.nearest_descendant_seed(commit);
        combine_visible_uploads(
            ancestor.map(|(_, distance, map)| (map, distance)),
            descendant.map(|(_, distance, map)| (map, distance)),
        )
    }

    /// Lazily emit one envelope per inhabited commit in topological order.
    pub fn stream(&self) -> EnvelopeStream<'_, 'g> {
        EnvelopeStream::new(self)
    }

    /// Drain the stream into maps keyed by commit name. Convenience for
    /// tests and small graphs; holding every commit's upload list at once
    /// defeats the link compression on large repositories.
    pub fn gather(&self) -> (FxHashMap<String, Vec<UploadMeta>>, FxHashMap<String, Link>) {
        let mut uploads = FxHashMap::default();
        let mut links = FxHashMap::default();

        for envelope in self.stream() {
            match envelope {
                Envelope::Uploads(relationship) => {
                    uploads.insert(relationship.commit.to_string(), relationship.uploads);
                }
                Envelope::Links(relationship) => {
                    links.insert(relationship.commit.to_string(), Link::from(&relationship));
                }
            }
        }

        (uploads, links)
    }

    /// Commits carrying a materialized upload map in the ancestor direction
    pub fn ancestor_seeds(&self) -> impl Iterator<Item = &'g str> + '_ {
        let commits = self.commits;
        self.ancestor_uploads
            .iter()
            .enumerate()
            .filter(|(_, map)| map.is_some())
            .map(move |(index, _)| commits.name(CommitId::from_index(index)))
    }

    /// Commits carrying a materialized upload map in the descendant direction
    pub fn descendant_seeds(&self) -> impl Iterator<Item = &'g str> + '_ {
        let commits = self.commits;
        self.descendant_uploads
            .iter()
            .enumerate()
            .filter(|(_, map)| map.is_some())
            .map(move |(index, _)| commits.name(CommitId::from_index(index)))
    }

    pub(super) fn nearest_ancestor_seed(
        &self,
        commit: CommitId,
    ) -> Option<(CommitId, u32, &SeedMap)> {
        traverse_for_commit(self.commits.parents(), &self.ancestor_uploads, commit)
    }

    pub(super) fn nearest_descendant_seed(
        &self,
        commit: CommitId,
    ) -> Option<(CommitId, u32, &SeedMap)> {
        traverse_for_commit(&self.children, &self.descendant_uploads, commit)
    }
}
