//! Browser backend (wasm32): renders twig trees into the page's DOM.
//!
//! ```rust,ignore
//! #[wasm_bindgen(start)]
//! pub fn start() -> Result<(), JsValue> {
//!     twig_web::init_logging(log::Level::Info);
//!     let root = twig_web::create_root("app")?;
//!     root.render(component(app, ())).map_err(twig_web::to_js)?;
//!     std::mem::forget(root);
//!     Ok(())
//! }
//! ```

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::*;
