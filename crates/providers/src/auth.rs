//! API key resolution for the single configured model family.
//!
//! There is exactly one upstream credential to resolve: the environment
//! variable named by [`lumen_domain::config::LlmConfig::api_key_env`]. No
//! rotation, cooldown, or keychain fallback — a single flash-class adapter
//! has no pool of keys to round-robin over.

use lumen_domain::error::{Error, Result};

/// Resolve the API key from the environment variable named by `env_var`.
pub fn resolve_api_key(env_var: &str) -> Result<String> {
    std::env::var(env_var).map_err(|_| {
        Error::Config(format!(
            "environment variable '{env_var}' not set or not valid UTF-8"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_env_var() {
        let var_name = "LUMEN_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let result = resolve_api_key(var_name).unwrap();
        assert_eq!(result, "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_env_var_missing() {
        let err = resolve_api_key("LUMEN_TEST_NONEXISTENT_VAR_8888").unwrap_err();
        assert!(err.to_string().contains("LUMEN_TEST_NONEXISTENT_VAR_8888"));
    }
}
