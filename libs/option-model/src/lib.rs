use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TEST_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Native lumens or an issued (code, issuer) asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

impl Asset {
    pub fn credit(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Asset::Credit {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    /// Non-native assets need a trustline on the holding account.
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset: Asset,
    pub amount: Decimal,
}

impl AssetAmount {
    pub fn new(asset: Asset, amount: Decimal) -> Self {
        Self { asset, amount }
    }

    pub fn native(amount: Decimal) -> Self {
        Self::new(Asset::Native, amount)
    }
}

/// Terms of a European option.
///
/// * `underlying` - what the seller escrows and the buyer may take.
/// * `premium` - paid by the buyer to the seller at setup.
/// * `exercise` - strike, paid by the buyer to the seller on exercise.
/// * `expiry` - first instant the option can be exercised.
/// * `delay` - seconds after `expiry` during which exercise stays open;
///   afterwards only the seller's refund is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionParams {
    pub underlying: AssetAmount,
    pub premium: AssetAmount,
    pub exercise: AssetAmount,
    pub expiry: DateTime<Utc>,
    pub delay: i64,
}

impl OptionParams {
    /// End of the exercise window, which is also where the refund window opens.
    pub fn exercise_deadline(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.delay).and_then(|delay| self.expiry.checked_add_signed(delay))
    }
}

/// Fee, reserve and timeout settings of the target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub network_passphrase: String,
    /// Native balance locked per ledger subentry.
    pub base_reserve: Decimal,
    /// Fee per operation, in stroops.
    pub base_fee: u32,
    pub submit_timeout_secs: u64,
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self {
            network_passphrase: PUBLIC_NETWORK_PASSPHRASE.to_string(),
            base_reserve: Decimal::new(5, 1),
            base_fee: 1000,
            submit_timeout_secs: 1800,
        }
    }
}

/// Partial [`NetworkParameters`]; every field left unset falls back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOverrides {
    #[serde(default)]
    pub network_passphrase: Option<String>,
    #[serde(default)]
    pub base_reserve: Option<Decimal>,
    #[serde(default)]
    pub base_fee: Option<u32>,
    #[serde(default)]
    pub submit_timeout_secs: Option<u64>,
}

impl NetworkOverrides {
    /// Layers `self` over `fallback`, `self` winning per field.
    pub fn or(self, fallback: NetworkOverrides) -> NetworkOverrides {
        NetworkOverrides {
            network_passphrase: self.network_passphrase.or(fallback.network_passphrase),
            base_reserve: self.base_reserve.or(fallback.base_reserve),
            base_fee: self.base_fee.or(fallback.base_fee),
            submit_timeout_secs: self.submit_timeout_secs.or(fallback.submit_timeout_secs),
        }
    }

    pub fn apply(self, base: NetworkParameters) -> NetworkParameters {
        NetworkParameters {
            network_passphrase: self.network_passphrase.unwrap_or(base.network_passphrase),
            base_reserve: self.base_reserve.unwrap_or(base.base_reserve),
            base_fee: self.base_fee.unwrap_or(base.base_fee),
            submit_timeout_secs: self.submit_timeout_secs.unwrap_or(base.submit_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_target_public_network() {
        let net = NetworkParameters::default();
        assert_eq!(net.network_passphrase, PUBLIC_NETWORK_PASSPHRASE);
        assert_eq!(net.base_reserve, dec!(0.5));
        assert_eq!(net.base_fee, 1000);
        assert_eq!(net.submit_timeout_secs, 1800);
    }

    #[test]
    fn override_wins_per_field() {
        let overrides = NetworkOverrides {
            base_fee: Some(100),
            ..Default::default()
        };
        let net = overrides.apply(NetworkParameters::default());
        assert_eq!(net.base_fee, 100);
        assert_eq!(net.base_reserve, dec!(0.5));
        assert_eq!(net.network_passphrase, PUBLIC_NETWORK_PASSPHRASE);
    }

    #[test]
    fn layered_overrides_prefer_the_outer_layer() {
        let service = NetworkOverrides {
            network_passphrase: Some(TEST_NETWORK_PASSPHRASE.to_string()),
            base_fee: Some(200),
            ..Default::default()
        };
        let request = NetworkOverrides {
            base_fee: Some(300),
            ..Default::default()
        };
        let net = request.or(service).apply(NetworkParameters::default());
        assert_eq!(net.network_passphrase, TEST_NETWORK_PASSPHRASE);
        assert_eq!(net.base_fee, 300);
        assert_eq!(net.submit_timeout_secs, 1800);
    }

    #[test]
    fn params_deserialize_from_json() {
        let raw = r#"{
            "underlying": {"asset": {"type": "credit", "code": "USD", "issuer": "GISSUER"}, "amount": "12.5"},
            "premium": {"asset": {"type": "native"}, "amount": "10"},
            "exercise": {"asset": {"type": "native"}, "amount": "200"},
            "expiry": "2030-01-01T00:00:00Z",
            "delay": 3600
        }"#;
        let params: OptionParams = serde_json::from_str(raw).unwrap();
        assert_eq!(params.underlying.asset, Asset::credit("USD", "GISSUER"));
        assert_eq!(params.underlying.amount, dec!(12.5));
        assert!(params.premium.asset.is_native());
        assert_eq!(
            params.exercise_deadline().unwrap().timestamp(),
            params.expiry.timestamp() + 3600
        );
    }
}
