use serde::Deserialize;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Identifier of the protocol that owns lazily created markets.
    pub protocol_id: String,

    /// Decimal precision of the market receipt token (cToken convention is 8).
    pub receipt_token_decimals: u32,

    /// Underlying-asset decimals assumed for a market created before its
    /// metadata is known.
    pub underlying_decimals_default: u32,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            protocol_id: std::env::var("PROTOCOL_ID").unwrap_or_else(|_| "compound-v2".into()),
            receipt_token_decimals: std::env::var("RECEIPT_TOKEN_DECIMALS")
                .unwrap_or_else(|_| "8".into())
                .parse()?,
            underlying_decimals_default: std::env::var("UNDERLYING_DECIMALS_DEFAULT")
                .unwrap_or_else(|_| "18".into())
                .parse()?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocol_id: "compound-v2".into(),
            receipt_token_decimals: 8,
            underlying_decimals_default: 18,
        }
    }
}
