//! Rotatable credential pool.

use secrecy::SecretString;

use crate::error::LlmError;

/// Pool of provider API keys, rotated round-robin across retry attempts.
///
/// Attempt `n` of a retried operation is bound to key `n mod len`, so a
/// key that has exhausted its quota is sidestepped by the next attempt
/// instead of being hammered again.
pub struct CredentialPool {
    keys: Vec<SecretString>,
}

impl CredentialPool {
    /// Build a pool. Fails fast when no keys are configured — a pool that
    /// cannot authenticate anything is a configuration error, not a
    /// runtime condition to retry.
    pub fn new(keys: Vec<String>) -> Result<Self, LlmError> {
        if keys.is_empty() {
            return Err(LlmError::Config(
                "no API credentials configured".to_string(),
            ));
        }
        Ok(Self {
            keys: keys.into_iter().map(SecretString::from).collect(),
        })
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        false // construction rejects empty pools
    }

    /// Key for a retry attempt: round-robin `attempt % len`.
    pub fn key_for(&self, attempt: u32) -> &SecretString {
        &self.keys[attempt as usize % self.keys.len()]
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("keys", &self.keys.len())
            .finish()
    }
}
