//! HTTP surface: the presentation request form and a JSON API.

pub mod form;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState, PPTX_MIME};
