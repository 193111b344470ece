use std::env;
use tracing::warn;

/// Resolve API key from the environment variable named by `env_name`
pub fn resolve_api_key(provider: &str, env_name: Option<&str>) -> Option<String> {
    let raw = env_name.map(str::trim).filter(|raw| !raw.is_empty())?;
    match env::var(raw) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        Ok(_) => {
            warn!(provider, env_var = raw, "API key environment variable is empty");
            None
        }
        Err(err) => {
            warn!(
                provider,
                env_var = raw,
                %err,
                "API key environment variable is not set"
            );
            None
        }
    }
}
