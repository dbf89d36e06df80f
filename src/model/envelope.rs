//! Stream output shapes
//!
//! One envelope is produced per inhabited commit: either the full visible
//! upload set, or a link to the nearest seed commits from which that set
//! can be reconstructed by following at most one pointer per direction.

use super::UploadMeta;

/// The full set of uploads visible from a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityRelationship<'g> {
    pub commit: &'g str,
    pub uploads: Vec<UploadMeta>,
}

/// Pointers to the nearest seed ancestor and descendant of a commit, with
/// the edge distances needed to shift their upload maps. Either pointer may
/// be absent when the walk ran off that end of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelationship<'g> {
    pub commit: &'g str,
    pub ancestor: Option<&'g str>,
    pub ancestor_distance: u32,
    pub descendant: Option<&'g str>,
    pub descendant_distance: u32,
}

/// A single stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<'g> {
    Uploads(VisibilityRelationship<'g>),
    Links(LinkRelationship<'g>),
}

/// Owned form of a link row, used by gathered results and store read-backs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Link {
    pub ancestor: Option<String>,
    pub ancestor_distance: u32,
    pub descendant: Option<String>,
    pub descendant_distance: u32,
}

impl From<&LinkRelationship<'_>> for Link {
    fn from(link: &LinkRelationship<'_>) -> Self {
        Self {
            ancestor: link.ancestor.map(str::to_string),
            ancestor_distance: link.ancestor_distance,
            descendant: link.descendant.map(str::to_string),
            descendant_distance: link.descendant_distance,
        }
    }
}
