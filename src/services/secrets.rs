use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0} is not configured")]
    Missing(&'static str),
}

/// Hands out the short-lived credential for the remote voice platform.
/// Callers fetch once per flow invocation and never hold the key across
/// unrelated flows.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn voice_api_key(&self) -> Result<String, SecretError>;
}

/// Environment-backed provider. Reads on every call so a rotated key is
/// picked up without a restart.
pub struct EnvSecrets;

#[async_trait]
impl SecretProvider for EnvSecrets {
    async fn voice_api_key(&self) -> Result<String, SecretError> {
        std::env::var("VOICE_API_KEY").map_err(|_| SecretError::Missing("VOICE_API_KEY"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Fixed-key provider for tests; optionally fails to exercise the
    /// credential-failure path.
    pub struct StaticSecrets {
        pub key: Option<String>,
    }

    #[async_trait]
    impl SecretProvider for StaticSecrets {
        async fn voice_api_key(&self) -> Result<String, SecretError> {
            self.key
                .clone()
                .ok_or(SecretError::Missing("VOICE_API_KEY"))
        }
    }
}
