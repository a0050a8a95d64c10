use bitflags::bitflags;
use smallvec::SmallVec;

use crate::NodeId;

bitflags! {
    /// Mutation categories, for filtering the log.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MutationKinds: u8 {
        const CHILD_LIST = 1 << 0;
        const ATTRIBUTES = 1 << 1;
        const CHARACTER_DATA = 1 << 2;
        const PROPERTIES = 1 << 3;
        const LISTENERS = 1 << 4;

        /// What a DOM mutation observer would report.
        const OBSERVABLE = Self::CHILD_LIST.bits()
            | Self::ATTRIBUTES.bits()
            | Self::CHARACTER_DATA.bits();
    }
}

/// One change to a node attached to the document body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    ChildList {
        target: NodeId,
        added: SmallVec<[NodeId; 1]>,
        removed: SmallVec<[NodeId; 1]>,
    },
    Attribute {
        target: NodeId,
        name: String,
        old: Option<String>,
    },
    CharacterData {
        target: NodeId,
        old: String,
    },
    Property {
        target: NodeId,
        name: String,
    },
    Listener {
        target: NodeId,
        event: String,
        added: bool,
    },
}

impl Mutation {
    pub fn kind(&self) -> MutationKinds {
        match self {
            Mutation::ChildList { .. } => MutationKinds::CHILD_LIST,
            Mutation::Attribute { .. } => MutationKinds::ATTRIBUTES,
            Mutation::CharacterData { .. } => MutationKinds::CHARACTER_DATA,
            Mutation::Property { .. } => MutationKinds::PROPERTIES,
            Mutation::Listener { .. } => MutationKinds::LISTENERS,
        }
    }

    pub fn target(&self) -> NodeId {
        match self {
            Mutation::ChildList { target, .. }
            | Mutation::Attribute { target, .. }
            | Mutation::CharacterData { target, .. }
            | Mutation::Property { target, .. }
            | Mutation::Listener { target, .. } => *target,
        }
    }

    pub fn added(&self) -> &[NodeId] {
        match self {
            Mutation::ChildList { added, .. } => added,
            _ => &[],
        }
    }

    pub fn removed(&self) -> &[NodeId] {
        match self {
            Mutation::ChildList { removed, .. } => removed,
            _ => &[],
        }
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Mutation::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Aggregate view over a slice of mutations.
pub trait MutationLog {
    fn of_kind(&self, kinds: MutationKinds) -> Vec<&Mutation>;
    fn added_count(&self) -> usize;
    fn removed_count(&self) -> usize;
    fn touches_attribute(&self, target: NodeId, name: &str) -> bool;
}

impl MutationLog for [Mutation] {
    fn of_kind(&self, kinds: MutationKinds) -> Vec<&Mutation> {
        self.iter().filter(|m| kinds.contains(m.kind())).collect()
    }

    fn added_count(&self) -> usize {
        self.iter().map(|m| m.added().len()).sum()
    }

    fn removed_count(&self) -> usize {
        self.iter().map(|m| m.removed().len()).sum()
    }

    fn touches_attribute(&self, target: NodeId, name: &str) -> bool {
        self.iter()
            .any(|m| m.target() == target && m.attribute_name() == Some(name))
    }
}
