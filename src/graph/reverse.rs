//! Transposed commit adjacency

use super::interner::CommitId;

/// Flip every parent edge into a child edge. Every commit present in the
/// input has an entry in the output, so leaves map to empty lists.
/// Duplicate parent entries are propagated, not deduplicated.
pub(super) fn reverse_graph(parents: &[Vec<CommitId>]) -> Vec<Vec<CommitId>> {
    let mut children = vec![Vec::new(); parents.len()];
    for (commit, commit_parents) in parents.iter().enumerate() {
        for parent in commit_parents {
            children[parent.index()].push(CommitId::from_index(commit));
        }
    }
    children
}
