//! # In-memory document
//!
//! A headless presentation tree for twig: render into it, fire events at it,
//! inspect the markup and the mutations a render produced.
//!
//! ```rust
//! use twig_core::*;
//! use twig_dom::Document;
//!
//! let doc = Document::new();
//! let root = doc.create_root();
//! root.render(element("div").attr("className", "container").text("Hello World"))
//!     .unwrap();
//!
//! let container = doc.query_selector(doc.body(), ".container").unwrap();
//! assert_eq!(doc.inner_html(container), "Hello World");
//! ```
//!
//! State changes render one idle turn later; drive the document's idle queue
//! with [`Document::run_until_idle`].

mod document;
mod html;
pub mod mutation;

pub use document::{Document, NodeId};
pub use mutation::{Mutation, MutationKinds, MutationLog};
