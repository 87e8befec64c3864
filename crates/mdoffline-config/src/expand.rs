//! Environment variable and home directory expansion for path settings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//! - a leading `~` - expands to the home directory

use std::convert::Infallible;

use crate::ConfigError;

/// Expand environment variable references and a leading `~` in a string.
///
/// Bare `$VAR` syntax is left alone (only `${VAR}` with braces).
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    let expanded = expand_env(value, field)?;
    Ok(shellexpand::tilde(&expanded).into_owned())
}

fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let expanded = shellexpand::env_with_context(value, |var| -> Result<Option<String>, Infallible> {
        Ok(std::env::var(var).ok())
    })
    .map_or_else(|e| match e.cause {}, std::borrow::Cow::into_owned);

    // Unset variables without a default are left verbatim by the expander.
    if let Some(start) = expanded.find("${") {
        let rest = &expanded[start + 2..];
        let name = rest.split('}').next().unwrap_or(rest);
        return Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{name}}} not set"),
        });
    }

    Ok(expanded)
}
