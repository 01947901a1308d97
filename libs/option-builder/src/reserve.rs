use option_model::NetworkParameters;
use rust_decimal::Decimal;
use tracing::debug;

/// Escrow existence reserve plus the two pre-auth signer subentries and margin.
const BASE_SUBENTRIES: i64 = 4;
/// Payment, trust removal and merge on the refund path.
const BASE_OPERATIONS: i64 = 3;

/// Native starting balance for the escrow account.
///
/// A conservative floor, not a tight minimum: a non-native underlying adds
/// one trustline subentry and one trust-removal operation to pay for.
pub fn minimum_balance(underlying_is_native: bool, network: &NetworkParameters) -> Decimal {
    let extra = if underlying_is_native { 0 } else { 1 };
    let fee_per_operation = Decimal::new(network.base_fee as i64, 7);
    let balance = network.base_reserve * Decimal::from(BASE_SUBENTRIES + extra)
        + fee_per_operation * Decimal::from(BASE_OPERATIONS + extra);
    debug!(underlying_is_native, %balance, "escrow minimum balance");
    balance
}
