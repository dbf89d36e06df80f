//! Parsed commit DAG input
//!
//! The engine consumes the output of `git log --topo-order --pretty='%H %P'`:
//! one line per commit, commit hash first, parent hashes after, children
//! printed before their parents.

use rustc_hash::FxHashSet;

use super::interner::{CommitId, CommitInterner};

/// A repository commit DAG with a topological ordering of its commits.
pub struct CommitGraph {
    commits: CommitInterner,
    parents: Vec<Vec<CommitId>>,
    order: Vec<CommitId>,
}

impl CommitGraph {
    /// Parse `git log` lines into parent adjacency plus a topological order
    /// with parents ahead of children (the reverse of the log's line order).
    ///
    /// Duplicate commit lines violate the input contract and are not
    /// defended against.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut commits = CommitInterner::new();
        let mut parents: Vec<Vec<CommitId>> = Vec::new();
        let mut listed = Vec::new();

        for line in lines {
            let mut fields = line.as_ref().split_whitespace();
            let Some(commit) = fields.next() else { continue };
            let commit = commits.intern(commit);
            let commit_parents: Vec<CommitId> = fields.map(|p| commits.intern(p)).collect();

            if commit.index() >= parents.len() {
                parents.resize_with(commit.index() + 1, Vec::new);
            }
            parents[commit.index()] = commit_parents;
            listed.push(commit);
        }
        parents.resize_with(commits.len(), Vec::new);

        // A hash that only ever appears as a parent comes from a truncated
        // log. It has no known parents of its own, so it sorts before
        // everything that references it.
        let with_line: FxHashSet<CommitId> = listed.iter().copied().collect();
        let mut order: Vec<CommitId> = (0..commits.len())
            .map(CommitId::from_index)
            .filter(|id| !with_line.contains(id))
            .collect();
        order.extend(listed.iter().rev());

        Self {
            commits,
            parents,
            order,
        }
    }

    /// Commits in topological order, parents before children
    pub fn order(&self) -> &[CommitId] {
        &self.order
    }

    /// Parent adjacency indexed by commit id
    pub(super) fn parents(&self) -> &[Vec<CommitId>] {
        &self.parents
    }

    /// Resolve a commit name to its interned id
    pub fn lookup(&self, name: &str) -> Option<CommitId> {
        self.commits.lookup(name)
    }

    /// Commit name for an interned id
    pub fn name(&self, id: CommitId) -> &str {
        self.commits.name(id)
    }

    /// Number of commits in the graph
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
