use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use stellar_xdr::curr::TransactionEnvelope;

use crate::envelope::AccountId;

#[derive(Error, Debug)]
pub enum OptionError {
    #[error("{leg} amount must not be negative: {amount}")]
    NegativeAmount { leg: &'static str, amount: Decimal },
    #[error("{leg} amount must be greater than zero")]
    ZeroAmount { leg: &'static str },
    #[error("exercise delay must not be negative: {0}s")]
    NegativeDelay(i64),
    #[error("amount {0} is not representable in stroops")]
    AmountPrecision(Decimal),
    #[error("invalid account id: {0}")]
    InvalidAccountId(String),
    #[error("invalid asset code: {0:?}")]
    InvalidAssetCode(String),
    #[error("timestamp out of range: {0}")]
    TimeOutOfRange(String),
    #[error("lock sequence out of range: ledger {height} offset {offset}")]
    SequenceOutOfRange { height: u32, offset: i64 },
    #[error("a transaction carries 1 to 100 operations, got {0}")]
    OperationCount(usize),
    #[error("fee of {base_fee} per operation overflows for {operations} operations")]
    FeeOverflow { base_fee: u32, operations: usize },
    #[error("ledger query failed: {0}")]
    Ledger(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("xdr encoding failed: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

impl OptionError {
    /// True when the caller's input is at fault. Ledger outages and local
    /// signing or encoding failures are not.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            OptionError::Ledger(_) | OptionError::Signing(_) | OptionError::Xdr(_)
        )
    }
}

impl From<reqwest::Error> for OptionError {
    fn from(e: reqwest::Error) -> Self {
        OptionError::Ledger(e.to_string())
    }
}

/// Height and close time of the most recently closed ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub height: u32,
    pub close_time: DateTime<Utc>,
}

/// An account as seen by transaction building: its id and current sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: AccountId,
    pub sequence: i64,
}

/// The three envelopes of one option, tied to one freshly generated escrow.
///
/// `setup` carries the escrow's signature and still needs buyer and seller.
/// `exercise` needs the buyer's signature; `refund` needs none, since the
/// escrow accepts both by hash.
#[derive(Debug, Clone)]
pub struct OptionTransactionSet {
    pub escrow_account_id: AccountId,
    /// Sequence the escrow is bumped to during setup.
    pub lock_sequence: i64,
    pub escrow_balance: Decimal,
    pub setup: TransactionEnvelope,
    pub exercise: TransactionEnvelope,
    pub refund: TransactionEnvelope,
}
