/// Joins a layout template name and the context key the inner output is
/// bound to, e.g. `base@@@@content`.
pub const NAME_CONTENT_DELIM: &str = "@@@@";

/// Context key used when a layout names no key of its own.
pub const DEFAULT_CONTENT_KEY: &str = "yield";

/// A parsed layout selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout<'a> {
    pub name: &'a str,
    pub content_key: &'a str,
}

impl<'a> Layout<'a> {
    pub fn parse(spec: &'a str) -> Self {
        match spec.split_once(NAME_CONTENT_DELIM) {
            Some((name, key)) if !key.is_empty() => Self {
                name,
                content_key: key,
            },
            Some((name, _)) => Self {
                name,
                content_key: DEFAULT_CONTENT_KEY,
            },
            None => Self {
                name: spec,
                content_key: DEFAULT_CONTENT_KEY,
            },
        }
    }
}
