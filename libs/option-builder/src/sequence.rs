//! Predicts the sequence number an escrow account is locked to.
//!
//! The escrow does not exist when exercise and refund are built, so their
//! sequence is chosen up front: far enough out that setup cannot overtake it
//! while in flight, close enough to stay reachable by expiry. The estimate is
//! the midpoint between the ledger reached when setup times out and the ledger
//! reached at expiry.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{LedgerSnapshot, OptionError};

pub const AVG_LEDGER_CLOSE_SECS: f64 = 5.0;

/// Ledgers between now and the chosen lock point.
pub fn target_ledger_offset(
    now: DateTime<Utc>,
    submit_timeout_secs: u64,
    expiry: DateTime<Utc>,
) -> i64 {
    let submit_ledgers = submit_timeout_secs as f64 / AVG_LEDGER_CLOSE_SECS;
    let expiry_ledgers = (expiry - now).num_seconds() as f64 / AVG_LEDGER_CLOSE_SECS;
    let midpoint = (submit_ledgers * AVG_LEDGER_CLOSE_SECS + expiry_ledgers * AVG_LEDGER_CLOSE_SECS)
        / (2.0 * AVG_LEDGER_CLOSE_SECS);
    midpoint.floor() as i64
}

/// Sequence number whose high 32 bits are the target ledger height.
///
/// An `expiry` at or before `now` is not rejected; the result may then lie
/// behind the escrow's real sequence and the option is unusable.
pub fn estimate_lock_sequence(
    ledger: &LedgerSnapshot,
    now: DateTime<Utc>,
    submit_timeout_secs: u64,
    expiry: DateTime<Utc>,
) -> Result<i64, OptionError> {
    let offset = target_ledger_offset(now, submit_timeout_secs, expiry);
    let height = (ledger.height as i64)
        .checked_add(offset)
        .filter(|h| (0..=i32::MAX as i64).contains(h))
        .ok_or(OptionError::SequenceOutOfRange {
            height: ledger.height,
            offset,
        })?;
    let sequence = height << 32;
    debug!(
        ledger = ledger.height,
        ledger_age_secs = (now - ledger.close_time).num_seconds(),
        offset,
        sequence,
        "estimated escrow lock sequence"
    );
    Ok(sequence)
}
