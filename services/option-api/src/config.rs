use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use option_model::NetworkOverrides;
use rust_decimal::Decimal;

pub struct ApiConfig {
    pub horizon_url: String,
    pub bind_addr: String,
    /// Service-wide network settings; request overrides are layered on top.
    pub network: NetworkOverrides,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            horizon_url: env::var("HORIZON_URL").unwrap_or("https://horizon.stellar.org".into()),
            bind_addr: env::var("BIND_ADDR").unwrap_or("127.0.0.1:7000".into()),
            network: NetworkOverrides {
                network_passphrase: env::var("NETWORK_PASSPHRASE").ok(),
                base_reserve: parse_var::<Decimal>("BASE_RESERVE")?,
                base_fee: parse_var::<u32>("BASE_FEE")?,
                submit_timeout_secs: parse_var::<u64>("SUBMIT_TIMEOUT_SECS")?,
            },
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{} is not valid: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
