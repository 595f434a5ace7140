#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RenderGoldError {
    #[error("Options file not found at {path}")]
    #[diagnostic(help("Create a rendergold.toml file or pass options in code"))]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse rendergold.toml")]
    #[diagnostic(help("Check the TOML syntax in your rendergold.toml file"))]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template '{name}' not found at {path}")]
    #[diagnostic(help("Template names are resolved as <directory>/<name>.gold"))]
    TemplateNotFound { name: String, path: PathBuf },

    #[error("Failed to compile template '{name}' at {path}")]
    #[diagnostic(help("Fix the template syntax, or the template it extends or imports"))]
    CompileError {
        name: String,
        path: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("Failed to link templates in {dir}")]
    #[diagnostic(help("Look for templates that extend each other in a cycle"))]
    LinkError {
        dir: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("Failed to execute template '{name}'")]
    ExecuteError {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("Invalid header value: {value}")]
    #[diagnostic(help("Content type and charset must be visible ASCII"))]
    InvalidHeaderValue {
        value: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
}

pub type Result<T> = std::result::Result<T, RenderGoldError>;

/// Join an error and all of its sources into one line.
///
/// Tera reports the interesting part (the missing variable, the bad token)
/// on the innermost source, so the top-level message alone is rarely useful
/// as a response body.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_includes_sources() {
        let err = RenderGoldError::Io {
            context: "reading views".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(error_chain(&err), "IO error: reading views: no such file");
    }

    #[test]
    fn chain_without_source_is_display() {
        let err = RenderGoldError::TemplateNotFound {
            name: "index".into(),
            path: PathBuf::from("templates/index.gold"),
        };
        assert_eq!(
            error_chain(&err),
            "Template 'index' not found at templates/index.gold"
        );
    }
}
