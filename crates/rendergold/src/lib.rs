//! Gold template rendering for axum.
//!
//! Install [`renderer`] as a layer and take a [`Renderer`] in any handler:
//! templates are looked up as `<directory>/<name>.gold`, executed against a
//! binding, and written to the response with a
//! `Content-Type: text/html; charset=UTF-8` header. Failures become a
//! `500` whose body is the error message.

pub mod error;
pub mod funcs;
pub mod generator;
pub mod middleware;
pub mod options;
pub mod render;
pub mod response;

pub use error::{RenderGoldError, Result};
pub use funcs::FuncMap;
pub use generator::{CompiledTemplate, Generator, Mode, NAME_CONTENT_DELIM};
pub use middleware::{renderer, RenderState};
pub use options::{compiled_charset, load_options, resolve, Options};
pub use render::{HtmlOptions, Render, Renderer};
pub use response::{RequestHead, ResponseWriter};
