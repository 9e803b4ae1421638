//! Environment-backed configuration access.
//!
//! All backend credentials and model names come from the process
//! environment, optionally seeded from a `.env` file the first time any
//! value is read.

use std::sync::Once;

use crate::utilities::errors::GenerationError;

static ENV_INIT: Once = Once::new();

/// Load `.env` into the process environment once.
///
/// Missing `.env` files are not an error; values already present in the
/// environment always win.
pub fn load_env() {
    ENV_INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// Read an environment variable, treating empty strings as unset.
pub fn env_var(name: &str) -> Option<String> {
    load_env();
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read a mandatory credential variable.
///
/// # Errors
/// Returns [`GenerationError::MissingApiKey`] when the variable is unset
/// or empty.
pub fn require_env(name: &'static str) -> Result<String, GenerationError> {
    env_var(name).ok_or(GenerationError::MissingApiKey { var: name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_count_as_unset() {
        std::env::set_var("PERSONAFORGE_TEST_EMPTY", "   ");
        assert_eq!(env_var("PERSONAFORGE_TEST_EMPTY"), None);
        std::env::remove_var("PERSONAFORGE_TEST_EMPTY");
    }

    #[test]
    fn require_env_reports_the_variable_name() {
        std::env::remove_var("PERSONAFORGE_TEST_MISSING");
        let err = require_env("PERSONAFORGE_TEST_MISSING").unwrap_err();
        assert!(err.to_string().contains("PERSONAFORGE_TEST_MISSING"));
    }
}
