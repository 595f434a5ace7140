use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use tera::{Tera, Value};

use crate::error::{error_chain, RenderGoldError, Result};
use crate::generator::{context_from_binding, Generator};
use crate::options::Options;
use crate::response::{self, RequestHead, ResponseWriter};

/// Extra options for [`Render::html`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Layout template to wrap the output in, as `name` or
    /// `name@@@@content-key`.
    pub layout: Option<String>,
}

impl HtmlOptions {
    pub fn layout(layout: impl Into<String>) -> Self {
        Self {
            layout: Some(layout.into()),
        }
    }
}

/// The render service handed to request handlers.
pub trait Render {
    /// Writes only the status; no JSON encoding happens here.
    fn json(&mut self, status: StatusCode, value: &Value);

    /// Render `<directory>/<name>.gold` against `binding` and write it out.
    /// `Value::Null` renders with no binding.
    fn html(
        &mut self,
        status: StatusCode,
        name: &str,
        binding: &Value,
        options: Option<&HtmlOptions>,
    );

    /// Writes only the status; the bytes are not sent.
    fn data(&mut self, status: StatusCode, bytes: &[u8]);

    fn error(&mut self, status: StatusCode);

    fn status(&mut self, status: StatusCode);

    /// Redirect to `location`, with `302 Found` unless a status is given.
    fn redirect(&mut self, location: &str, status: Option<StatusCode>);

    /// The compiled template object model is not exposed; always `None`.
    fn template(&self) -> Option<&Tera>;
}

/// Render service bound to a single request.
#[derive(Debug)]
pub struct Renderer {
    writer: ResponseWriter,
    req: RequestHead,
    options: Arc<Options>,
    compiled_charset: Arc<str>,
    generator: Arc<Generator>,
}

impl Renderer {
    pub fn new(
        req: RequestHead,
        options: Arc<Options>,
        compiled_charset: Arc<str>,
        generator: Arc<Generator>,
    ) -> Self {
        Self {
            writer: ResponseWriter::new(),
            req,
            options,
            compiled_charset,
            generator,
        }
    }

    pub fn request(&self) -> &RequestHead {
        &self.req
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The response written so far.
    pub fn response(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn into_writer(self) -> ResponseWriter {
        self.writer
    }

    fn execute(
        &self,
        name: &str,
        binding: &Value,
        options: Option<&HtmlOptions>,
    ) -> Result<Vec<u8>> {
        let template = self.generator.parse_file(name)?;
        let context = context_from_binding(template.name(), binding)?;
        let mut buf = Vec::new();
        match options.and_then(|o| o.layout.as_deref()) {
            Some(layout) => template.execute_with_layout(&context, layout, &mut buf)?,
            None => template.execute(&context, &mut buf)?,
        }
        Ok(buf)
    }

    fn content_type(&self) -> Result<HeaderValue> {
        let value = format!("{}{}", self.options.html_content_type, self.compiled_charset);
        HeaderValue::from_str(&value)
            .map_err(|e| RenderGoldError::InvalidHeaderValue { value, source: e })
    }
}

impl Render for Renderer {
    fn json(&mut self, status: StatusCode, _value: &Value) {
        self.writer.write_header(status);
    }

    fn html(
        &mut self,
        status: StatusCode,
        name: &str,
        binding: &Value,
        options: Option<&HtmlOptions>,
    ) {
        let rendered = self
            .execute(name, binding, options)
            .and_then(|out| Ok((self.content_type()?, out)));
        let (content_type, out) = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                response::http_error(
                    &mut self.writer,
                    &error_chain(&err),
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
                return;
            }
        };

        self.writer.headers_mut().insert(CONTENT_TYPE, content_type);
        self.writer.write_header(status);
        self.writer.write(&out);
    }

    fn data(&mut self, status: StatusCode, _bytes: &[u8]) {
        self.writer.write_header(status);
    }

    fn error(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    fn status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    fn redirect(&mut self, location: &str, status: Option<StatusCode>) {
        let status = status.unwrap_or(StatusCode::FOUND);
        response::redirect(&mut self.writer, &self.req, location, status);
    }

    fn template(&self) -> Option<&Tera> {
        None
    }
}

impl IntoResponse for Renderer {
    fn into_response(self) -> Response {
        self.writer.finish()
    }
}
