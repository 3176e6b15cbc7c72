/// Runtime settings, resolved from the environment with local-dev defaults.
///
/// The API key guards the REST gateway only; Weaviate itself runs with
/// anonymous access on the local Docker setup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the Weaviate instance.
    pub weaviate_url: String,
    /// Static key expected in the `X-API-Key` header.
    pub api_key: String,
    /// Bind address of the REST gateway.
    pub api_addr: String,
    /// Bind address of the web dashboard.
    pub web_addr: String,
    /// Base URL of the REST gateway, used by the CLI client.
    pub api_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            weaviate_url: env_or("WEAVIATE_URL", "http://localhost:8080"),
            api_key: env_or("MEMBANK_API_KEY", "test-api-key"),
            api_addr: env_or("MEMBANK_API_ADDR", "0.0.0.0:5000"),
            web_addr: env_or("MEMBANK_WEB_ADDR", "0.0.0.0:5001"),
            api_url: env_or("MEMBANK_API_URL", "http://localhost:5000"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_to_default() {
        assert_eq!(env_or("MEMBANK_TEST_UNSET_VAR", "fallback"), "fallback");
    }
}
