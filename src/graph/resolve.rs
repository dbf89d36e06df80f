//! First-parent seed walks and ancestor/descendant merging

use crate::model::{UploadMeta, FLAG_ANCESTOR_VISIBLE, FLAG_OVERWRITTEN};

use super::interner::CommitId;
use super::populate::SeedMap;

/// Follow first parents from `commit` until a populated commit is found,
/// returning it with the number of edges walked and its upload map. Every
/// commit with multiple parents is itself populated, so the first-parent
/// choice only ever crosses single-parent transit commits.
pub(super) fn traverse_for_commit<'a>(
    parents: &[Vec<CommitId>],
    uploads: &'a [Option<SeedMap>],
    mut commit: CommitId,
) -> Option<(CommitId, u32, &'a SeedMap)> {
    let mut distance = 0;
    loop {
        if let Some(map) = uploads[commit.index()].as_ref() {
            return Some((commit, distance, map));
        }

        let commit_parents = &parents[commit.index()];
        if commit_parents.is_empty() {
            return None;
        }

        commit = commit_parents[0];
        distance += 1;
    }
}

/// Merge the upload maps visible by looking in opposite directions from a
/// commit into one flat list:
///
///   1. every ancestor-visible upload, shifted by the ancestor distance;
///   2. every descendant-visible upload whose token has no ancestor-side
///      entry; and
///   3. for tokens present on both sides where the descendant entry is
///      strictly closer, the descendant entry as well, with the losing
///      ancestor entry kept but marked overwritten.
pub(super) fn combine_visible_uploads(
    ancestor: Option<(&SeedMap, u32)>,
    descendant: Option<(&SeedMap, u32)>,
) -> Vec<UploadMeta> {
    let (ancestor_uploads, ancestor_distance) = match ancestor {
        Some((map, distance)) => (Some(map), distance),
        None => (None, 0),
    };
    let (descendant_uploads, descendant_distance) = match descendant {
        Some((map, distance)) => (Some(map), distance),
        None => (None, 0),
    };

    let capacity = ancestor_uploads
        .map_or(0, SeedMap::len)
        .max(descendant_uploads.map_or(0, SeedMap::len));
    let mut uploads = Vec::with_capacity(capacity);

    if let Some(ancestor_uploads) = ancestor_uploads {
        for (token, &upload) in ancestor_uploads {
            let mut ancestor_upload = upload;
            ancestor_upload.flags += ancestor_distance;
            ancestor_upload.flags |= FLAG_ANCESTOR_VISIBLE;

            if let Some(&upload) = descendant_uploads.and_then(|map| map.get(token)) {
                let mut descendant_upload = upload;
                descendant_upload.flags += descendant_distance;
                descendant_upload.flags &= !FLAG_ANCESTOR_VISIBLE;

                if descendant_upload.replaces(ancestor_upload) {
                    ancestor_upload.flags |= FLAG_OVERWRITTEN;
                    uploads.push(descendant_upload);
                }
            }

            uploads.push(ancestor_upload);
        }
    }

    if let Some(descendant_uploads) = descendant_uploads {
        for (token, &upload) in descendant_uploads {
            if ancestor_uploads.is_some_and(|map| map.contains_key(token)) {
                continue;
            }

            let mut descendant_upload = upload;
            descendant_upload.flags += descendant_distance;
            descendant_upload.flags &= !FLAG_ANCESTOR_VISIBLE;
            uploads.push(descendant_upload);
        }
    }

    uploads
}
