//! Template engine based on MiniJinja
//!
//! Input files usually already contain Helm (`{{ }}`) or other Go-template
//! syntax, so expansion uses its own delimiters:
//!
//! | purpose    | open  | close |
//! |------------|-------|-------|
//! | expression | `@<<` | `>>@` |
//! | statement  | `@<%` | `%>@` |
//! | comment    | `@<#` | `#>@` |
//!
//! Templates get no context object. Everything they read comes from
//! `datasource(name, key)` and the helper filters/functions.

use std::path::Path;
use std::sync::Arc;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior, Value};

use crate::datasource::{Datasource, DatasourceRegistry};
use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

pub const EXPRESSION_DELIMITERS: (&str, &str) = ("@<<", ">>@");
pub const STATEMENT_DELIMITERS: (&str, &str) = ("@<%", "%>@");
pub const COMMENT_DELIMITERS: (&str, &str) = ("@<#", "#>@");

/// Template engine builder
#[derive(Debug, Default)]
pub struct EngineBuilder {
    registry: DatasourceRegistry,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datasource(mut self, name: impl Into<String>, source: impl Datasource + 'static) -> Self {
        self.registry.register(name, source);
        self
    }

    pub fn registry(mut self, registry: DatasourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<Engine> {
        Engine::new(self.registry)
    }
}

/// Expands templates against a fixed set of datasources
pub struct Engine {
    env: Environment<'static>,
    registry: Arc<DatasourceRegistry>,
}

impl Engine {
    /// Create an engine with strict undefined handling
    pub fn new(registry: DatasourceRegistry) -> Result<Self> {
        let registry = Arc::new(registry);
        let env = create_environment(Arc::clone(&registry))?;
        Ok(Self { env, registry })
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Expand `source`; `name` identifies the template in errors
    ///
    /// Nothing is returned unless the whole template renders.
    pub fn render(&self, name: &str, source: &str) -> Result<String> {
        let template = self
            .env
            .template_from_named_str(name, source)
            .map_err(|e| TemplateError::from_minijinja(e, name, source))?;

        template
            .render(())
            .map_err(|e| EngineError::Template(TemplateError::from_minijinja(e, name, source)))
    }

    /// Read and expand a file, using its path as the template name
    pub fn render_file(&self, path: &Path) -> Result<String> {
        let source = std::fs::read_to_string(path).map_err(|source| EngineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path.to_string_lossy();

        tracing::debug!(template = %name, "expanding");
        self.render(&name, &source)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("registry", &self.registry).finish()
    }
}

fn create_environment(registry: Arc<DatasourceRegistry>) -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .variable_delimiters(EXPRESSION_DELIMITERS.0, EXPRESSION_DELIMITERS.1)
        .block_delimiters(STATEMENT_DELIMITERS.0, STATEMENT_DELIMITERS.1)
        .comment_delimiters(COMMENT_DELIMITERS.0, COMMENT_DELIMITERS.1)
        .build()
        .map_err(EngineError::Syntax)?;
    env.set_syntax(syntax);

    // Expanded files are written back verbatim; YAML must not be escaped
    // and the final newline must survive
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    env.add_function("datasource", move |name: String, key: String| -> std::result::Result<Value, Error> {
        registry
            .resolve(&name, &key)
            .map(|value| Value::from_serialize(&value))
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()).with_source(e))
    });

    env.add_filter("toyaml", filters::toyaml);
    env.add_filter("tojson", filters::tojson);
    env.add_filter("tojson_pretty", filters::tojson_pretty);
    env.add_filter("b64encode", filters::b64encode);
    env.add_filter("b64decode", filters::b64decode);
    env.add_filter("sha256", filters::sha256sum);
    env.add_filter("quote", filters::quote);
    env.add_filter("squote", filters::squote);
    env.add_filter("indent", filters::indent);
    env.add_filter("nindent", filters::nindent);
    env.add_filter("required", filters::required);
    env.add_filter("empty", filters::empty);
    env.add_filter("haskey", filters::haskey);
    env.add_filter("keys", filters::keys);
    env.add_filter("merge", filters::merge);
    env.add_filter("trunc", filters::trunc);
    env.add_filter("trimprefix", filters::trimprefix);
    env.add_filter("trimsuffix", filters::trimsuffix);
    env.add_filter("snakecase", filters::snakecase);
    env.add_filter("kebabcase", filters::kebabcase);
    env.add_filter("date", filters::date);
    env.add_filter("semver_match", filters::semver_match);

    env.add_function("fail", functions::fail);
    env.add_function("dict", functions::dict);
    env.add_function("list", functions::list);
    env.add_function("get", functions::get);
    env.add_function("dig", functions::dig);
    env.add_function("coalesce", functions::coalesce);
    env.add_function("ternary", functions::ternary);
    env.add_function("tostring", functions::tostring);
    env.add_function("toint", functions::toint);
    env.add_function("tofloat", functions::tofloat);
    env.add_function("now", functions::now);
    env.add_function("printf", functions::printf);

    Ok(env)
}
