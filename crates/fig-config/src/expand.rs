//! Environment variable expansion for configuration strings.
//!
//! - `${VAR}` expands to the value of VAR, errors if unset
//! - `${VAR:-default}` expands to VAR if set, otherwise the default
//!
//! Bare `$VAR` syntax is left untouched.

use crate::ConfigError;

/// Expand `${VAR}` references in a configuration string.
///
/// `field` names the config field for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Fast path: nothing to expand
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(UnsetVar(var.to_owned())),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.0),
    })
}

struct UnsetVar(String);
