//! Immutable descriptions of how to launch an external program.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A fully-resolved description of how to launch an external program.
///
/// An `Invocation` is immutable once constructed: all fields are private and
/// there are no mutating accessors. Templates with placeholders live in the
/// registry; by the time an `Invocation` exists every argument is literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl Invocation {
    /// Create an invocation for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory the child is spawned in.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment override for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The program to execute (bare name or path).
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The ordered argument list.
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// The working directory, if one was set.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Environment overrides applied on top of the inherited environment.
    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_args_in_order() {
        let inv = Invocation::new("ollama").arg("chat").args(["--model", "1.5b"]);
        assert_eq!(inv.program(), "ollama");
        assert_eq!(inv.arg_list(), &["chat", "--model", "1.5b"]);
    }

    #[test]
    fn working_dir_and_env_are_optional() {
        let inv = Invocation::new("ollama");
        assert!(inv.working_dir().is_none());
        assert!(inv.env_overrides().is_empty());

        let inv = Invocation::new("ollama")
            .current_dir("/opt/ollama")
            .env("OLLAMA_HOST", "127.0.0.1:11434");
        assert_eq!(inv.working_dir(), Some(Path::new("/opt/ollama")));
        assert_eq!(
            inv.env_overrides().get("OLLAMA_HOST").map(String::as_str),
            Some("127.0.0.1:11434")
        );
    }

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("ollama").args(["run", "7b"]);
        assert_eq!(inv.to_string(), "ollama run 7b");
    }
}
