//! Seed-commit selection and per-token nearest-upload maps
//!
//! Only a subset of commits carry a materialized upload map. A commit is a
//! seed when it anchors an upload, has multiple parents or children, or
//! sits next to a fork or merge (its sole parent has multiple children, or
//! its sole child has multiple parents). Every other commit lies on a
//! single unambiguous chain in both directions and can be reconstructed
//! from its nearest seeds at stream time.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::model::UploadMeta;

use super::interner::{CommitId, TokenId};

pub(super) type SeedMap = FxHashMap<TokenId, UploadMeta>;

/// Walk every commit in topological order (reversed for the descendant
/// pass) and compute the per-token nearest-upload map for each seed.
/// `parents` points in the traversal direction; `children` is its
/// transpose. Non-seed commits are left unpopulated.
pub(super) fn populate_uploads_by_traversal(
    parents: &[Vec<CommitId>],
    children: &[Vec<CommitId>],
    order: &[CommitId],
    meta: &[Vec<(TokenId, UploadMeta)>],
    reverse: bool,
) -> Vec<Option<SeedMap>> {
    let mut uploads: Vec<Option<SeedMap>> = vec![None; parents.len()];

    for i in 0..order.len() {
        let commit = if reverse {
            order[order.len() - i - 1]
        } else {
            order[i]
        };

        let commit_parents = &parents[commit.index()];
        let commit_children = &children[commit.index()];

        let anchors_upload = !meta[commit.index()].is_empty();
        if !anchors_upload
            && commit_children.len() <= 1
            && commit_parents.len() <= 1
            && (commit_parents.is_empty() || children[commit_parents[0].index()].len() == 1)
            && (commit_children.is_empty() || parents[commit_children[0].index()].len() == 1)
        {
            continue;
        }

        // Advance through transit commits until the frontier is populated
        // or widens past a single parent. A frontier of several commits
        // consists entirely of seeds processed earlier in the walk, all at
        // the same distance from the starting commit.
        let mut ancestors: &[CommitId] = commit_parents;
        let mut distance = 1;
        while ancestors.len() == 1 {
            if uploads[ancestors[0].index()].is_some() {
                break;
            }
            distance += 1;
            ancestors = &parents[ancestors[0].index()];
        }

        let populated = populate_uploads_for_commit(&uploads, ancestors, distance, meta, commit);
        uploads[commit.index()] = Some(populated);
    }

    uploads
}

/// Build one seed commit's map: the uploads anchored at the commit at
/// distance zero, merged with every nearest ancestor's map shifted by the
/// measured distance. Per token the smaller distance wins, ties broken
/// toward the smaller upload id.
fn populate_uploads_for_commit(
    uploads: &[Option<SeedMap>],
    ancestors: &[CommitId],
    distance: u32,
    meta: &[Vec<(TokenId, UploadMeta)>],
    commit: CommitId,
) -> SeedMap {
    // The capacity is an underestimate when ancestor maps are disjoint,
    // but counting the union would cost another traversal.
    let mut capacity = meta[commit.index()].len();
    for ancestor in ancestors {
        if let Some(map) = uploads[ancestor.index()].as_ref() {
            capacity = capacity.max(map.len());
        }
    }
    let mut uploads_by_token = SeedMap::with_capacity_and_hasher(capacity, Default::default());

    // Anchored uploads shadow anything inherited for the same token.
    for &(token, upload) in &meta[commit.index()] {
        uploads_by_token.insert(token, upload);
    }

    for ancestor in ancestors {
        let Some(map) = uploads[ancestor.index()].as_ref() else {
            continue;
        };
        for (&token, &upload) in map {
            let mut inherited = upload;
            inherited.flags += distance;

            match uploads_by_token.entry(token) {
                Entry::Vacant(entry) => {
                    entry.insert(inherited);
                }
                Entry::Occupied(mut entry) => {
                    if inherited.replaces(*entry.get()) {
                        entry.insert(inherited);
                    }
                }
            }
        }
    }

    uploads_by_token
}
