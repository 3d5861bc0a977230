//! Template compilation and rendering
//!
//! Every catalog service carries two templates: the values template rendered
//! at provision time and the credentials template rendered at bind time.
//! Both are compiled once, when the catalog (re)loads, into a shared
//! MiniJinja environment that is safe for concurrent rendering.

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::error::{EngineError, Result};
use crate::filters;
use crate::functions;

/// Template name of the chart-values document
pub const VALUES_TEMPLATE: &str = "values";

/// Template name of the user-credentials document
pub const CREDENTIALS_TEMPLATE: &str = "credentials";

/// Create the environment all catalog templates are compiled into
///
/// Chainable undefined behavior lets templates probe optional parameters
/// (`parameters.size`) without erroring, matching how service authors write
/// optional overrides.
fn create_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);

    env.add_filter("toyaml", filters::toyaml);
    env.add_filter("fromyaml", filters::fromyaml);
    env.add_filter("b64encode", filters::b64encode);
    env.add_filter("b64decode", filters::b64decode);
    env.add_filter("quote", filters::quote);
    env.add_filter("indent", filters::indent);
    env.add_filter("nindent", filters::nindent);
    env.add_filter("trunc", filters::trunc);
    env.add_filter("sha256", filters::sha256sum);
    env.add_filter("md5sum", filters::md5sum);
    env.add_filter("htpasswd", filters::htpasswd);
    env.add_filter("bcrypt", filters::bcrypt_hash);

    env.add_function("generate_username", functions::generate_username);
    env.add_function("generate_password", functions::generate_password);
    env.add_function("generate_dns_names", functions::generate_dns_names);
    env.add_function("env", functions::env);
    env.add_function("fail", functions::fail);
    env.add_function("dict", functions::dict);
    env.add_function("list", functions::list);
    env.add_function("coalesce", functions::coalesce);
    env.add_function("ternary", functions::ternary);

    env
}

/// The compiled values/credentials template pair of one catalog service
///
/// Compilation happens once per catalog load; rendering takes a context
/// value and is safe from concurrent requests.
#[derive(Debug)]
pub struct TemplatePair {
    env: Environment<'static>,
}

impl TemplatePair {
    /// Compile both template sources, failing on the first syntax error
    pub fn compile(values_source: &str, credentials_source: &str) -> Result<Self> {
        let mut env = create_environment();

        env.add_template_owned(VALUES_TEMPLATE.to_string(), values_source.to_string())
            .map_err(|source| EngineError::Compile {
                name: VALUES_TEMPLATE.to_string(),
                source,
            })?;

        env.add_template_owned(
            CREDENTIALS_TEMPLATE.to_string(),
            credentials_source.to_string(),
        )
        .map_err(|source| EngineError::Compile {
            name: CREDENTIALS_TEMPLATE.to_string(),
            source,
        })?;

        Ok(Self { env })
    }

    /// Render the values template
    pub fn render_values(&self, context: Value) -> Result<String> {
        self.render(VALUES_TEMPLATE, context)
    }

    /// Render the credentials template
    pub fn render_credentials(&self, context: Value) -> Result<String> {
        self.render(CREDENTIALS_TEMPLATE, context)
    }

    fn render(&self, name: &str, context: Value) -> Result<String> {
        let template = self.env.get_template(name).map_err(|source| EngineError::Render {
            name: name.to_string(),
            source,
        })?;

        template.render(context).map_err(|source| EngineError::Render {
            name: name.to_string(),
            source,
        })
    }
}
