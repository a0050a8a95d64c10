use thiserror::Error;

use crate::presentation::NodeKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A hook was called while no component was being evaluated.
    #[error("hooks can only be called while a component is being evaluated")]
    InvalidHookContext,

    /// A component called its hooks in a different order or count than on its
    /// previous evaluation.
    #[error("component `{component}` changed its hook order at hook #{index}")]
    HookOrderViolation {
        component: &'static str,
        index: usize,
    },

    #[error("presentation node is {found:?}, expected {expected:?}")]
    IncompatiblePresentationNode { expected: NodeKind, found: NodeKind },

    #[error("presentation node is detached or was already removed")]
    MissingPresentationNode,

    #[error("component `{0}` has not produced a result")]
    NotMounted(&'static str),

    #[error("element node has an empty tag name")]
    MissingTag,

    #[error("a render is already in progress for this root")]
    RenderInProgress,

    #[error("presentation backend: {0}")]
    Backend(String),
}

impl Error {
    /// Local conditions that the reconciler heals by rebuilding the subtree
    /// instead of aborting the render.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::HookOrderViolation { .. }
                | Error::IncompatiblePresentationNode { .. }
                | Error::MissingPresentationNode
        )
    }
}
