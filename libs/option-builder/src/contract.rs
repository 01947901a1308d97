use option_model::{AssetAmount, NetworkOverrides, NetworkParameters, OptionParams};
use rust_decimal::Decimal;

use crate::builder::to_stroops;
use crate::envelope::{ledger_asset, parse_account_id, AccountId};
use crate::types::OptionError;

/// A validated option between a buyer and a seller.
///
/// Immutable once built and not tied to any escrow; every engine build
/// derives a new escrow account from it.
#[derive(Debug, Clone)]
pub struct OptionContract {
    buyer: AccountId,
    seller: AccountId,
    params: OptionParams,
    network: NetworkParameters,
}

impl OptionContract {
    pub fn new(
        buyer: &str,
        seller: &str,
        params: OptionParams,
        overrides: NetworkOverrides,
    ) -> Result<Self, OptionError> {
        let buyer = parse_account_id(buyer)?;
        let seller = parse_account_id(seller)?;

        check_leg("underlying", &params.underlying)?;
        check_leg("premium", &params.premium)?;
        check_leg("exercise", &params.exercise)?;
        if params.delay < 0 {
            return Err(OptionError::NegativeDelay(params.delay));
        }
        // The exercise window's last second becomes its max time bound, and a
        // zero max time bound never expires on the ledger.
        let window_closes = params
            .exercise_deadline()
            .map(|deadline| deadline.timestamp() - 1);
        if params.expiry.timestamp() < 0 || !matches!(window_closes, Some(last) if last > 0) {
            return Err(OptionError::TimeOutOfRange(params.expiry.to_rfc3339()));
        }

        let network = overrides.apply(NetworkParameters::default());
        if network.base_reserve < Decimal::ZERO {
            return Err(OptionError::NegativeAmount {
                leg: "base reserve",
                amount: network.base_reserve,
            });
        }

        Ok(Self {
            buyer,
            seller,
            params,
            network,
        })
    }

    pub fn buyer(&self) -> &AccountId {
        &self.buyer
    }

    pub fn seller(&self) -> &AccountId {
        &self.seller
    }

    pub fn params(&self) -> &OptionParams {
        &self.params
    }

    pub fn network(&self) -> &NetworkParameters {
        &self.network
    }
}

fn check_leg(leg: &'static str, value: &AssetAmount) -> Result<(), OptionError> {
    if value.amount < Decimal::ZERO {
        return Err(OptionError::NegativeAmount {
            leg,
            amount: value.amount,
        });
    }
    if value.amount.is_zero() {
        return Err(OptionError::ZeroAmount { leg });
    }
    to_stroops(value.amount)?;
    ledger_asset(&value.asset)?;
    Ok(())
}
