// Synthetic commit graph and upload view generators for the benchmarks
#![allow(dead_code)]

use commitgraph::graph::CommitGraphView;
use commitgraph::model::UploadMeta;

/// Generate `git log`-shaped lines for a mostly linear history with a
/// branch/merge diamond every `branch_every` commits
pub fn generate_commit_lines(num_commits: usize, branch_every: usize) -> Vec<String> {
    let mut oldest_first: Vec<String> = Vec::with_capacity(num_commits + num_commits / branch_every);
    oldest_first.push("c0".to_string());

    for i in 1..num_commits {
        if i % branch_every == 0 {
            oldest_first.push(format!("s{} c{}", i, i - 1));
            oldest_first.push(format!("c{} c{} s{}", i, i - 1, i));
        } else {
            oldest_first.push(format!("c{} c{}", i, i - 1));
        }
    }

    oldest_first.reverse();
    oldest_first
}

/// Anchor an upload every `upload_every` commits, cycling through
/// `num_roots` distinct tokens
pub fn generate_view(num_commits: usize, upload_every: usize, num_roots: usize) -> CommitGraphView {
    let mut view = CommitGraphView::new();
    let mut upload_id = 1;

    for i in (0..num_commits).step_by(upload_every) {
        let token = format!("sub{}/:lsif-rust", (i / upload_every) % num_roots);
        view.add(UploadMeta::new(upload_id), &format!("c{}", i), &token);
        upload_id += 1;
    }

    view
}
