pub use crate::deps;
pub use crate::effects::{Dispose, on_cleanup};
pub use crate::error::{Error, Result};
pub use crate::hooks::{Dep, Deps, SetState, use_effect, use_state};
pub use crate::node::{Element, Event, Handler, Node, PropValue, component, element, text};
pub use crate::options::{RenderOptions, RenderStats};
pub use crate::presentation::{NodeKind, Presentation};
pub use crate::root::Root;
pub use crate::schedule::{IdleQueue, IdleScheduler};
