//!
//! Utility functions shared by the configuration and augmentation code.
//!
//! This module provides:
//! - [`generate_request_id`] - Fresh UUIDv7 request identifiers for correlation
//! - [`replace_handlebars_with_env`] - Template substitution for environment variables
//!

use {
    regex::{Captures, Regex},
    std::{env, sync::LazyLock},
    uuid::{ContextV7, Timestamp, Uuid},
};

/// Regular expression pattern for matching handlebars-style environment variable references.
/// Matches patterns like `{{ VAR_NAME }}` with optional whitespace around the variable name.
/// Variable names must be uppercase letters, digits, or underscores (standard env var naming).
static HANDLEBAR_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Z0-9_]+)\s*\}\}").unwrap());

/// Generates a new request identifier.
///
/// Identifiers are UUIDv7 values with additional sub-millisecond precision, so
/// they sort by creation time and remain unique across the mesh. An inbound
/// request id is never reused: every call produces a fresh value.
///
/// ```
/// use mesh_identity::generate_request_id;
///
/// let a = generate_request_id();
/// let b = generate_request_id();
/// assert_ne!(a, b);
/// ```
pub fn generate_request_id() -> String {
    let cx = ContextV7::new().with_additional_precision();
    Uuid::new_v7(Timestamp::now(cx)).to_string()
}

/// Replaces handlebars-style placeholders with environment variable values.
///
/// Searches through the input string for patterns like `{{ VAR_NAME }}` and replaces
/// them with the corresponding environment variable value. Variable names are
/// case-sensitive and must consist of uppercase letters, digits, or underscores.
/// Whitespace around the variable name is allowed.
///
/// If an environment variable is not set, it is replaced with an empty string.
///
/// # Examples
///
/// ```
/// use mesh_identity::replace_handlebars_with_env;
///
/// let template = "Value: {{ MISSING_VAR }}";
/// let result = replace_handlebars_with_env(template);
/// assert_eq!(result, "Value: ");
/// ```
pub fn replace_handlebars_with_env(input: &str) -> String {
    HANDLEBAR_REGEXP
        .replace_all(input, |caps: &Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!(
                    variable = %var_name,
                    "Environment variable not found, substituting with empty string"
                );
                String::new()
            })
        })
        .to_string()
}
