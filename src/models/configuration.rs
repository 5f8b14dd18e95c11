use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Key of the single active configuration row. Writes are full replacements.
pub const CONFIG_ID: &str = "default";

/// Outbound delivery settings consumed by the external dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryConfiguration {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    #[serde(skip_serializing)]
    pub smtp_credential: String,
    pub use_tls: bool,
}

impl DeliveryConfiguration {
    /// Encode the credential for storage (base64; upgrade to a secret store
    /// later).
    pub fn encode_credential(credential: &str) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(credential.as_bytes())
    }

    pub fn decode_credential(encoded: &str) -> Result<String> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        Ok(String::from_utf8(decoded)?)
    }
}

/// Full replacement payload for the configuration row. The port is accepted
/// wide and range-checked so out-of-range values are reported instead of
/// silently truncated.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfigUpdate {
    pub smtp_host: String,
    pub smtp_port: u32,
    pub smtp_user: String,
    pub smtp_credential: String,
    pub use_tls: bool,
}

impl Default for DeliveryConfigUpdate {
    fn default() -> Self {
        DeliveryConfigUpdate {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_credential: String::new(),
            use_tls: true,
        }
    }
}
