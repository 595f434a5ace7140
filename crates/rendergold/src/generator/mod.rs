pub mod layout;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use tera::{Context, Template, Tera, Value};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{error_chain, RenderGoldError, Result};
use crate::funcs::FuncMap;

pub use layout::{Layout, DEFAULT_CONTENT_KEY, NAME_CONTENT_DELIM};

/// Extension every template file carries.
pub const TEMPLATE_EXTENSION: &str = "gold";

/// Environment variable read by [`Mode::from_env`].
pub const MODE_ENV_VAR: &str = "GOLD_ENV";

/// Whether compiled templates are reused between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Recompile on every call so template edits show up immediately.
    #[default]
    Development,
    /// Compile once and reuse.
    Production,
}

impl Mode {
    /// `""` and `"development"` select development, anything else production.
    pub fn from_env_value(value: &str) -> Self {
        match value {
            "" | "development" => Mode::Development,
            _ => Mode::Production,
        }
    }

    /// Read the mode from `GOLD_ENV`, defaulting to development when unset.
    pub fn from_env() -> Self {
        Self::from_env_value(&std::env::var(MODE_ENV_VAR).unwrap_or_default())
    }

    pub fn caches(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl FromStr for Mode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_env_value(s))
    }
}

/// File name of a logical template name, relative to the base directory.
pub fn template_file_name(name: &str) -> String {
    format!("{name}.{TEMPLATE_EXTENSION}")
}

/// Locates, compiles and (in production mode) caches Gold templates.
///
/// One generator is shared by every request of a middleware installation;
/// the cache is internally synchronized.
pub struct Generator {
    base_dir: PathBuf,
    mode: Mode,
    funcs: FuncMap,
    cache: RwLock<Option<Arc<TemplateSet>>>,
}

impl Generator {
    pub fn new(mode: Mode) -> Self {
        Self {
            base_dir: PathBuf::from("."),
            mode,
            funcs: FuncMap::default(),
            cache: RwLock::new(None),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self.clear_cache();
        self
    }

    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs = funcs;
        self.clear_cache();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Drop the cached template set; the next call recompiles.
    pub fn clear_cache(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Look up `<base_dir>/<name>.gold` and return it ready to execute.
    pub fn parse_file(&self, name: &str) -> Result<CompiledTemplate> {
        let set = if self.mode.caches() {
            self.cached()?
        } else {
            Arc::new(self.compile()?)
        };

        let file_name = template_file_name(name);
        set.check(name, &file_name)?;
        Ok(CompiledTemplate {
            set,
            name: file_name,
        })
    }

    fn cached(&self) -> Result<Arc<TemplateSet>> {
        if let Some(set) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            trace!(dir = %self.base_dir.display(), "template cache hit");
            return Ok(Arc::clone(set));
        }

        let mut slot = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have compiled while we waited for the lock.
        if let Some(set) = slot.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(self.compile()?);
        *slot = Some(Arc::clone(&set));
        Ok(set)
    }

    /// Compile every `.gold` file under the base directory into one set, so
    /// templates can extend and include each other by relative path. A file
    /// that fails to parse is left out and remembered, along with every
    /// template that extends or imports it.
    fn compile(&self) -> Result<TemplateSet> {
        let mut sources = Vec::new();
        let mut broken = BTreeMap::new();

        for entry in WalkDir::new(&self.base_dir).min_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        dir = %self.base_dir.display(),
                        error = %e,
                        "skipping unreadable template path"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Ok(rel_path) = path.strip_prefix(&self.base_dir) else {
                continue;
            };
            let name = rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let parsed = fs::read_to_string(path)
                .map_err(|e| tera::Error::chain(format!("Couldn't read {}", path.display()), e))
                .and_then(|content| {
                    let template =
                        Template::new(&name, Some(path.display().to_string()), &content)?;
                    Ok(Source::new(template, content))
                });
            match parsed {
                Ok(source) => sources.push(source),
                Err(e) => {
                    let reason = error_chain(&e);
                    warn!(template = %name, error = %reason, "skipping broken template");
                    broken.insert(name, reason);
                }
            }
        }

        // Drop templates whose parent or macro file did not make it in,
        // until nothing else depends on a missing one.
        loop {
            let loaded: HashSet<String> = sources.iter().map(|s| s.name.clone()).collect();
            let before = sources.len();
            sources.retain(|source| match source.missing_dependency(&loaded) {
                Some(dependency) => {
                    let reason = format!("depends on '{dependency}', which did not compile");
                    warn!(template = %source.name, error = %reason, "skipping broken template");
                    broken.insert(source.name.clone(), reason);
                    false
                }
                None => true,
            });
            if sources.len() == before {
                break;
            }
        }

        let count = sources.len();
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".gold"]);
        self.funcs.register(&mut tera);
        tera.add_raw_templates(sources.into_iter().map(|s| (s.name, s.content)))
            .map_err(|e| RenderGoldError::LinkError {
                dir: self.base_dir.clone(),
                source: e,
            })?;

        debug!(
            dir = %self.base_dir.display(),
            templates = count,
            broken = broken.len(),
            mode = ?self.mode,
            "compiled gold templates"
        );
        Ok(TemplateSet {
            tera,
            broken,
            base_dir: self.base_dir.clone(),
        })
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("Generator")
            .field("base_dir", &self.base_dir)
            .field("mode", &self.mode)
            .field("funcs", &self.funcs)
            .field("cached", &cached)
            .finish()
    }
}

/// A parsed template file waiting to be added to the set.
struct Source {
    name: String,
    content: String,
    dependencies: Vec<String>,
}

impl Source {
    fn new(template: Template, content: String) -> Self {
        let dependencies = template
            .parent
            .into_iter()
            .chain(template.imported_macro_files.into_iter().map(|(file, _)| file))
            .collect();
        Self {
            name: template.name,
            content,
            dependencies,
        }
    }

    fn missing_dependency(&self, loaded: &HashSet<String>) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| !loaded.contains(d.as_str()))
            .map(String::as_str)
    }
}

/// The templates of one base directory, plus the files that failed to
/// compile and why.
struct TemplateSet {
    tera: Tera,
    broken: BTreeMap<String, String>,
    base_dir: PathBuf,
}

impl TemplateSet {
    fn check(&self, name: &str, file_name: &str) -> Result<()> {
        if let Some(reason) = self.broken.get(file_name) {
            return Err(RenderGoldError::CompileError {
                name: name.to_string(),
                path: self.base_dir.join(file_name),
                source: tera::Error::msg(reason),
            });
        }
        if !self.tera.get_template_names().any(|n| n == file_name) {
            return Err(RenderGoldError::TemplateNotFound {
                name: name.to_string(),
                path: self.base_dir.join(file_name),
            });
        }
        Ok(())
    }
}

/// Turn a binding into an execution context. `Null` means no binding.
pub fn context_from_binding(name: &str, binding: &Value) -> Result<Context> {
    if binding.is_null() {
        return Ok(Context::new());
    }
    Context::from_value(binding.clone()).map_err(|e| RenderGoldError::ExecuteError {
        name: name.to_string(),
        source: e,
    })
}

/// A template located in a compiled set.
#[derive(Clone)]
pub struct CompiledTemplate {
    set: Arc<TemplateSet>,
    name: String,
}

impl CompiledTemplate {
    /// The template's file name relative to the base directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execute(&self, context: &Context, writer: impl Write) -> Result<()> {
        self.set
            .tera
            .render_to(&self.name, context, writer)
            .map_err(|e| RenderGoldError::ExecuteError {
                name: self.name.clone(),
                source: e,
            })
    }

    /// Render this template, then render the layout with the output bound
    /// under the layout's content key.
    pub fn execute_with_layout(
        &self,
        context: &Context,
        layout: &str,
        writer: impl Write,
    ) -> Result<()> {
        let layout = Layout::parse(layout);
        let layout_file = template_file_name(layout.name);
        self.set.check(layout.name, &layout_file)?;

        let inner =
            self.set
                .tera
                .render(&self.name, context)
                .map_err(|e| RenderGoldError::ExecuteError {
                    name: self.name.clone(),
                    source: e,
                })?;

        let mut outer = context.clone();
        outer.insert(layout.content_key, &inner);
        self.set
            .tera
            .render_to(&layout_file, &outer, writer)
            .map_err(|e| RenderGoldError::ExecuteError {
                name: layout_file,
                source: e,
            })
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .field("base_dir", &self.set.base_dir)
            .finish()
    }
}
