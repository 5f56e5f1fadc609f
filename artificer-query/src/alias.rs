use crate::model::{Alias, NodeKind, Selector};

/// Hands out join participant names.
///
/// Counters are per prefix, start at 1 and never go back, so a name is unique
/// for the lifetime of one compile even after the scope that used it closes.
#[derive(Debug, Default)]
pub(crate) struct AliasAllocator {
    artifact: u32,
    relationship: u32,
    target: u32,
    property: u32,
    attribute: u32,
}

impl AliasAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next(&mut self, kind: NodeKind) -> Selector {
        let (prefix, counter) = match kind {
            NodeKind::Artifact => ("artifact", &mut self.artifact),
            NodeKind::Relationship => ("relationship", &mut self.relationship),
            NodeKind::Target => ("target", &mut self.target),
            NodeKind::PropertyEntry => ("property", &mut self.property),
            NodeKind::RelationshipAttribute | NodeKind::TargetAttribute => {
                ("attribute", &mut self.attribute)
            }
        };
        *counter += 1;
        Selector::new(kind, Alias::new(format!("{prefix}{counter}")))
    }
}
