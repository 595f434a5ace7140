use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::Extension;
use http::request::Parts;
use http::StatusCode;

use crate::generator::{Generator, Mode};
use crate::options::{compiled_charset, resolve, Options};
use crate::render::Renderer;
use crate::response::RequestHead;

/// State shared by every request of one middleware installation.
#[derive(Debug, Clone)]
pub struct RenderState {
    options: Arc<Options>,
    compiled_charset: Arc<str>,
    generator: Arc<Generator>,
}

impl RenderState {
    /// Resolve `options` and build the shared generator.
    pub fn new(options: Option<Options>, mode: Mode) -> Self {
        let options = resolve(options);
        let compiled_charset = compiled_charset(&options.charset);
        let generator = Generator::new(mode)
            .with_base_dir(&options.directory)
            .with_funcs(options.funcs.clone());
        Self {
            options: Arc::new(options),
            compiled_charset: Arc::from(compiled_charset),
            generator: Arc::new(generator),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// A fresh renderer for one request.
    pub fn renderer(&self, req: RequestHead) -> Renderer {
        Renderer::new(
            req,
            Arc::clone(&self.options),
            Arc::clone(&self.compiled_charset),
            Arc::clone(&self.generator),
        )
    }
}

/// Middleware that makes [`Renderer`] available to handlers.
///
/// The default directory for templates is "templates" and the file extension
/// is ".gold". In [`Mode::Development`] templates are compiled on every
/// request; use [`Mode::Production`] (or [`Mode::from_env`]) to compile once.
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use http::StatusCode;
/// use rendergold::{renderer, Mode, Render, Renderer};
///
/// async fn index(mut r: Renderer) -> Renderer {
///     r.html(StatusCode::OK, "index", &serde_json::Value::Null, None);
///     r
/// }
///
/// let app: Router = Router::new()
///     .route("/", get(index))
///     .layer(renderer(None, Mode::from_env()));
/// ```
pub fn renderer(options: Option<Options>, mode: Mode) -> Extension<RenderState> {
    Extension(RenderState::new(options, mode))
}

#[async_trait]
impl<S> FromRequestParts<S> for Renderer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts.extensions.get::<RenderState>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "rendergold middleware is not installed",
        ))?;
        Ok(state.renderer(RequestHead::new(parts.method.clone(), parts.uri.clone())))
    }
}
