mod envelope;
mod meta;

pub use envelope::{Envelope, Link, LinkRelationship, VisibilityRelationship};
pub use meta::{UploadMeta, FLAG_ANCESTOR_VISIBLE, FLAG_OVERWRITTEN, MAX_DISTANCE};
