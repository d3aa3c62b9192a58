//! Declarative mapping from logical actions to invocation templates.
//!
//! The registry isolates command-line formatting (model names, ports) into
//! one validated component. It is populated once at application startup and
//! read-only afterwards, so concurrent readers need no locking.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::invocation::Invocation;

/// Errors raised by [`CommandRegistry`] registration and resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The action name is already registered.
    #[error("action `{0}` is already registered")]
    DuplicateAction(String),

    /// No template is registered under the requested action name.
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    /// A template placeholder has no corresponding entry in the parameters.
    #[error("action `{action}` requires parameter `{name}`")]
    MissingParameter {
        /// Action whose template could not be resolved.
        action: String,
        /// Name of the missing placeholder.
        name: String,
    },
}

/// An invocation template with named `{placeholder}` slots.
///
/// Placeholders may appear in the program, any argument, or any environment
/// value, and may be embedded in a longer token (`--model={model}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationTemplate {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl InvocationTemplate {
    /// Create a template for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    /// Append a single argument token.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several argument tokens.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory resolved invocations run in.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The working directory, if one was set.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

/// A static, validated mapping from logical action names to templates.
///
/// Registration happens in the composition root before any command runs;
/// afterwards the registry is only read. `resolve` never produces a
/// partially-substituted invocation: either every placeholder is filled or
/// the call fails with [`RegistryError::MissingParameter`].
#[derive(Debug, Default)]
pub struct CommandRegistry {
    actions: HashMap<String, InvocationTemplate>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under a logical action name.
    pub fn register(
        &mut self,
        action: impl Into<String>,
        template: InvocationTemplate,
    ) -> Result<(), RegistryError> {
        let action = action.into();
        if self.actions.contains_key(&action) {
            return Err(RegistryError::DuplicateAction(action));
        }
        self.actions.insert(action, template);
        Ok(())
    }

    /// Check whether an action is registered.
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Resolve an action into a concrete [`Invocation`].
    ///
    /// Every `{placeholder}` in the template must have an entry in `params`;
    /// unused parameters are ignored.
    pub fn resolve(
        &self,
        action: &str,
        params: &HashMap<String, String>,
    ) -> Result<Invocation, RegistryError> {
        let template = self
            .actions
            .get(action)
            .ok_or_else(|| RegistryError::UnknownAction(action.to_string()))?;

        let program = substitute(action, &template.program, params)?;
        let mut args = Vec::with_capacity(template.args.len());
        for arg in &template.args {
            args.push(substitute(action, arg, params)?);
        }

        let mut invocation = Invocation::new(program).args(args);
        if let Some(dir) = &template.working_dir {
            invocation = invocation.current_dir(dir.clone());
        }
        for (key, value) in &template.env {
            invocation = invocation.env(key.clone(), substitute(action, value, params)?);
        }

        debug!(action = %action, invocation = %invocation, "Resolved action");
        Ok(invocation)
    }
}

/// Substitute `{name}` placeholders in `input` from `params`.
///
/// An unmatched `{` with no closing `}` is kept literally.
fn substitute(
    action: &str,
    input: &str,
    params: &HashMap<String, String>,
) -> Result<String, RegistryError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        match params.get(name) {
            Some(value) => out.push_str(value),
            None => {
                return Err(RegistryError::MissingParameter {
                    action: action.to_string(),
                    name: name.to_string(),
                });
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
