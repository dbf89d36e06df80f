//! Commit and token interning for compact graph storage
//!
//! Maps 40-byte hex commit names and token strings to dense u32 ids so that
//! per-commit state lives in plain vectors instead of string-keyed maps.

use rustc_hash::FxHashMap;

/// Interned commit identifier, a dense index into the interner's table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CommitId(u32);

impl CommitId {
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }

    pub(super) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Interned token identifier. Tokens never leave the engine, so only the
/// forward direction is kept.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct TokenId(u32);

/// Commit interner mapping names to ids and back.
#[derive(Default)]
pub struct CommitInterner {
    map: FxHashMap<String, u32>,
    vec: Vec<String>,
}

impl CommitInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a commit name and return its id
    pub fn intern(&mut self, name: &str) -> CommitId {
        if let Some(&id) = self.map.get(name) {
            return CommitId(id);
        }
        let id = self.vec.len() as u32;
        self.map.insert(name.to_string(), id);
        self.vec.push(name.to_string());
        CommitId(id)
    }

    /// Look up an already-interned commit name
    pub fn lookup(&self, name: &str) -> Option<CommitId> {
        self.map.get(name).copied().map(CommitId)
    }

    /// Get the commit name for an id
    pub fn name(&self, id: CommitId) -> &str {
        &self.vec[id.index()]
    }

    /// Number of interned commits
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}

#[derive(Default)]
pub(super) struct TokenInterner {
    map: FxHashMap<String, u32>,
}

impl TokenInterner {
    pub(super) fn intern(&mut self, token: &str) -> TokenId {
        if let Some(&id) = self.map.get(token) {
            return TokenId(id);
        }
        let id = self.map.len() as u32;
        self.map.insert(token.to_string(), id);
        TokenId(id)
    }
}
