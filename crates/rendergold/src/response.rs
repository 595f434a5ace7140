use std::io;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use tera::escape_html;
use tracing::warn;
use url::Url;

/// The parts of an incoming request a response needs to know about.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    /// A `GET` for `uri`; falls back to `/` if `uri` does not parse.
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri.parse().unwrap_or_else(|_| Uri::from_static("/")))
    }
}

/// An in-flight HTTP response.
///
/// Headers may be changed until the status is written; the status is
/// written once, and later attempts are ignored. Writing body bytes
/// before a status writes `200 OK` first.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
    written: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable header map. Changes made after [`write_header`] do not reach
    /// the response.
    ///
    /// [`write_header`]: ResponseWriter::write_header
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn write_header(&mut self, status: StatusCode) {
        if let Some((first, _)) = &self.written {
            warn!(%first, ignored = %status, "superfluous write_header call");
            return;
        }
        self.written = Some((status, self.headers.clone()));
    }

    pub fn write(&mut self, buf: &[u8]) {
        if self.written.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
    }

    /// The status sent, or `200 OK` if none was written yet.
    pub fn status(&self) -> StatusCode {
        self.written
            .as_ref()
            .map(|(status, _)| *status)
            .unwrap_or(StatusCode::OK)
    }

    /// The headers as they went out with the status.
    pub fn sent_headers(&self) -> &HeaderMap {
        self.written
            .as_ref()
            .map(|(_, headers)| headers)
            .unwrap_or(&self.headers)
    }

    pub fn is_written(&self) -> bool {
        self.written.is_some()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the response as it would go out on the wire.
    pub fn finish(self) -> Response {
        let (status, headers) = match self.written {
            Some(written) => written,
            None => (StatusCode::OK, self.headers),
        };
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        self.finish()
    }
}

/// Reply with a plain-text error message and the given status.
pub fn http_error(w: &mut ResponseWriter, message: &str, status: StatusCode) {
    let headers = w.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    w.write_header(status);
    w.write(message.as_bytes());
    w.write(b"\n");
}

/// Reply with a redirect to `location`.
///
/// A location without scheme or host is resolved against the request path.
/// `GET` and `HEAD` requests without a preset content type get an HTML
/// content type, and `GET` gets a short link body.
pub fn redirect(w: &mut ResponseWriter, req: &RequestHead, location: &str, status: StatusCode) {
    let location = match resolve_location(req.uri.path(), location) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(%location, error = %e, "could not resolve redirect location");
            location.to_string()
        }
    };

    let had_content_type = w.headers().contains_key(CONTENT_TYPE);
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            w.headers_mut().insert(LOCATION, value);
        }
        Err(e) => warn!(%location, error = %e, "redirect location is not a valid header value"),
    }

    let html_body = !had_content_type && req.method == Method::GET;
    if !had_content_type && (req.method == Method::GET || req.method == Method::HEAD) {
        w.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }
    w.write_header(status);

    if html_body {
        let body = format!(
            "<a href=\"{}\">{}</a>.\n\n",
            escape_html(&location),
            status.canonical_reason().unwrap_or_default()
        );
        w.write(body.as_bytes());
    }
}

/// Host used to resolve relative locations; only the path, query and
/// fragment of the result are kept.
const RESOLVE_BASE: &str = "http://localhost";

/// Absolute URLs and `//host` references pass through, percent-encoded only
/// if they carry non-ASCII. Anything else is joined onto the request path.
fn resolve_location(request_path: &str, location: &str) -> Result<String, url::ParseError> {
    if location.starts_with("//") {
        return Ok(location.to_string());
    }
    match Url::parse(location) {
        Ok(_) if location.is_ascii() => return Ok(location.to_string()),
        Ok(url) => return Ok(url.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(e),
    }

    let mut base = Url::parse(RESOLVE_BASE)?;
    base.set_path(request_path);
    let resolved = base.join(location)?;

    let mut out = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = resolved.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}
