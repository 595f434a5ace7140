use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderGoldError, Result};
use crate::funcs::FuncMap;

pub const DEFAULT_DIRECTORY: &str = "templates";
pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_HTML_CONTENT_TYPE: &str = "text/html";
pub const OPTIONS_FILE: &str = "rendergold.toml";

/// Configuration for the renderer middleware. Empty fields are filled in by
/// [`resolve`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Options {
    /// Directory to load templates from. Default is "templates".
    #[serde(default)]
    pub directory: String,

    /// Helper functions available to every template.
    #[serde(skip)]
    pub funcs: FuncMap,

    /// Appended to the Content-Type header. Default is "UTF-8".
    #[serde(default)]
    pub charset: String,

    /// Content type for HTML output, e.g. "application/xhtml+xml" for XHTML.
    /// Default is "text/html".
    #[serde(default)]
    pub html_content_type: String,
}

impl Options {
    /// Fill every empty field with its default.
    pub fn resolved(mut self) -> Self {
        if self.directory.is_empty() {
            self.directory = DEFAULT_DIRECTORY.to_string();
        }
        if self.charset.is_empty() {
            self.charset = DEFAULT_CHARSET.to_string();
        }
        if self.html_content_type.is_empty() {
            self.html_content_type = DEFAULT_HTML_CONTENT_TYPE.to_string();
        }
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RenderGoldError::ConfigParse { source: e })
    }
}

/// Resolve an optional options record into a fully populated one.
pub fn resolve(options: Option<Options>) -> Options {
    options.unwrap_or_default().resolved()
}

/// The `; charset=...` suffix for the Content-Type header.
pub fn compiled_charset(charset: &str) -> String {
    let cs = if charset.is_empty() {
        DEFAULT_CHARSET
    } else {
        charset
    };
    format!("; charset={cs}")
}

/// Load options from a rendergold.toml file, or from a directory holding one.
///
/// The result is not resolved; pass it through [`resolve`] or the middleware.
pub fn load_options(path: &Path) -> Result<Options> {
    let options_path = if path.ends_with(OPTIONS_FILE) {
        path.to_path_buf()
    } else {
        path.join(OPTIONS_FILE)
    };

    if !options_path.exists() {
        return Err(RenderGoldError::ConfigNotFound { path: options_path });
    }

    let content = std::fs::read_to_string(&options_path).map_err(|e| RenderGoldError::Io {
        context: format!("reading {}", options_path.display()),
        source: e,
    })?;

    Options::from_toml_str(&content)
}
