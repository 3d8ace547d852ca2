//! OAuth credential references.
//!
//! `client_id` and `client_secret` may be written in plain text or point
//! somewhere else:
//!
//! - `env::VAR_NAME`: read from the environment at startup
//! - `pass::path/in/store`: first line of `pass show path/in/store`

use std::process::Command;

use crate::error::{ServerError, ServerResult};

/// Where a credential value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource<'a> {
    Plain(&'a str),
    Env(&'a str),
    Pass(&'a str),
}

impl<'a> CredentialSource<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Plain(value)
        }
    }
}

/// Resolves the credential `name` (e.g. "client_secret").
///
/// Missing values and failed lookups are configuration errors naming the
/// credential, so startup output tells which setting to fix.
pub fn resolve_credential(name: &str, value: Option<&str>) -> ServerResult<String> {
    let value = value.ok_or_else(|| {
        ServerError::config(format!(
            "{} is required (set it in config.toml, pass --{} or export {})",
            name,
            name.replace('_', "-"),
            name.to_uppercase()
        ))
    })?;

    let resolved = match CredentialSource::parse(value) {
        CredentialSource::Plain(text) => text.to_string(),
        CredentialSource::Env(var) => std::env::var(var).map_err(|_| {
            ServerError::config(format!(
                "{}: environment variable `{}` is not set",
                name, var
            ))
        })?,
        CredentialSource::Pass(path) => from_pass(name, path)?,
    };

    if resolved.trim().is_empty() {
        return Err(ServerError::config(format!("{} resolved to an empty value", name)));
    }
    Ok(resolved)
}

fn from_pass(name: &str, path: &str) -> ServerResult<String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| ServerError::config(format!("{}: cannot run pass: {}", name, e)))?;

    if !output.status.success() {
        return Err(ServerError::config(format!(
            "{}: pass entry `{}` unavailable ({})",
            name,
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ServerError::config(format!("{}: pass entry `{}` is empty", name, path)))
}
