//! Lazy per-commit envelope emission

use crate::model::{Envelope, LinkRelationship, VisibilityRelationship};

use super::resolve::combine_visible_uploads;
use super::VisibilityGraph;

/// Iterator producing one envelope per inhabited commit, in the input's
/// topological order. Nothing is buffered between emissions; dropping the
/// iterator stops the computation.
pub struct EnvelopeStream<'a, 'g> {
    graph: &'a VisibilityGraph<'g>,
    next: usize,
}

impl<'a, 'g> EnvelopeStream<'a, 'g> {
    pub(super) fn new(graph: &'a VisibilityGraph<'g>) -> Self {
        Self { graph, next: 0 }
    }
}

impl<'a, 'g> Iterator for EnvelopeStream<'a, 'g> {
    type Item = Envelope<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        let commits = self.graph.commits();

        while self.next < commits.order().len() {
            let commit = commits.order()[self.next];
            self.next += 1;

            let ancestor = self.graph.nearest_ancestor_seed(commit);
            let descendant = self.graph.nearest_descendant_seed(commit);
            if ancestor.is_none() && descendant.is_none() {
                continue;
            }

            let known = ancestor.map_or(0, |(_, _, map)| map.len())
                + descendant.map_or(0, |(_, _, map)| map.len());
            if known == 0 {
                continue;
            }

            let uploads = combine_visible_uploads(
                ancestor.map(|(_, distance, map)| (map, distance)),
                descendant.map(|(_, distance, map)| (map, distance)),
            );

            // Commits sitting on a seed store their set outright, as do
            // commits whose set is no bigger than the link row that would
            // replace it.
            let threshold = if ancestor.is_some() && descendant.is_some() {
                2
            } else {
                1
            };
            let at_seed =
                matches!(ancestor, Some((_, 0, _))) || matches!(descendant, Some((_, 0, _)));

            if at_seed || uploads.len() <= threshold {
                return Some(Envelope::Uploads(VisibilityRelationship {
                    commit: commits.name(commit),
                    uploads,
                }));
            }

            return Some(Envelope::Links(LinkRelationship {
                commit: commits.name(commit),
                ancestor: ancestor.map(|(seed, _, _)| commits.name(seed)),
                ancestor_distance: ancestor.map_or(0, |(_, distance, _)| distance),
                descendant: descendant.map(|(seed, _, _)| commits.name(seed)),
                descendant_distance: descendant.map_or(0, |(_, distance, _)| distance),
            }));
        }

        None
    }
}
