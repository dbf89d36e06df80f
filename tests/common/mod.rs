// Fixtures shared by the integration tests: view builders, gather
// canonicalization, and git2 helpers that synthesize commit topology
#![allow(dead_code)]

use commitgraph::graph::{CommitGraphView, VisibilityGraph};
use commitgraph::model::{Link, UploadMeta};
use git2::{Commit, Oid, Repository, Signature};
use rustc_hash::FxHashMap;
use tempfile::TempDir;

/// Build a view from (upload_id, commit, token) triples
pub fn build_view(uploads: &[(i64, &str, &str)]) -> CommitGraphView {
    let mut view = CommitGraphView::new();
    for &(upload_id, commit, token) in uploads {
        view.add(UploadMeta::new(upload_id), commit, token);
    }
    view
}

/// Gather a graph's stream with upload lists sorted by id, since list
/// order within an envelope is not significant
pub fn gather_sorted(
    graph: &VisibilityGraph<'_>,
) -> (FxHashMap<String, Vec<UploadMeta>>, FxHashMap<String, Link>) {
    let (mut uploads, links) = graph.gather();
    for list in uploads.values_mut() {
        list.sort_by_key(|upload| upload.upload_id);
    }
    (uploads, links)
}

/// Sorted copy of an upload list
pub fn sorted(mut uploads: Vec<UploadMeta>) -> Vec<UploadMeta> {
    uploads.sort_by_key(|upload| upload.upload_id);
    uploads
}

pub fn meta(upload_id: i64, flags: u32) -> UploadMeta {
    UploadMeta { upload_id, flags }
}

/// Create a bare temporary repository for synthesizing commit topology
pub fn create_test_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init_bare(dir.path()).unwrap();
    (dir, repo)
}

/// Create a commit with the given parents. The engine only looks at
/// topology, so every commit shares the empty tree.
pub fn commit(repo: &Repository, message: &str, parents: &[Oid]) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent_commits: Vec<Commit> = parents
        .iter()
        .map(|&oid| repo.find_commit(oid).unwrap())
        .collect();
    let parent_refs: Vec<&Commit> = parent_commits.iter().collect();

    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Render `git log --topo-order --pretty='%H %P'` lines for the commits
/// reachable from the given heads
pub fn log_lines(repo: &Repository, heads: &[Oid]) -> Vec<String> {
    let mut walk = repo.revwalk().unwrap();
    walk.set_sorting(git2::Sort::TOPOLOGICAL).unwrap();
    for &head in heads {
        walk.push(head).unwrap();
    }

    walk.map(|oid| {
        let oid = oid.unwrap();
        let commit = repo.find_commit(oid).unwrap();
        let mut line = oid.to_string();
        for parent in commit.parent_ids() {
            line.push(' ');
            line.push_str(&parent.to_string());
        }
        line
    })
    .collect()
}
