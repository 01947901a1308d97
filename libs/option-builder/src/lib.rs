use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

pub mod builder;
pub mod contract;
pub mod envelope;
pub mod ledger;
pub mod reserve;
pub mod sequence;
pub mod signer;
pub mod types;

pub use crate::contract::OptionContract;
pub use crate::envelope::AccountId;
pub use crate::ledger::{HorizonClient, LedgerQuery};
pub use crate::types::*;
pub use stellar_xdr::curr::TransactionEnvelope;

use crate::builder::TransactionBuilder;
use crate::envelope::{envelope_hash, time_bounds};
use crate::signer::EscrowSigner;

/// Builds the setup, exercise and refund transactions of an option.
pub struct OptionEngine<L> {
    ledger: L,
}

impl<L: LedgerQuery> OptionEngine<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn build(&self, contract: &OptionContract) -> Result<OptionTransactionSet, OptionError> {
        self.build_at(contract, Utc::now()).await
    }

    /// Same as [`build`](Self::build) with an explicit clock.
    ///
    /// Exercise and refund are built first against the escrow's predicted
    /// sequence; their hashes are then whitelisted by setup, which also
    /// disables the escrow's own key.
    pub async fn build_at(
        &self,
        contract: &OptionContract,
        now: DateTime<Utc>,
    ) -> Result<OptionTransactionSet, OptionError> {
        let network = contract.network();
        let params = contract.params();

        // 1. Fresh escrow identity
        let escrow = EscrowSigner::generate()?;
        let escrow_id = escrow.account_id();

        // 2. Lock sequence and reserve from a fresh ledger snapshot
        let ledger = self.ledger.latest_ledger().await?;
        let seller = self.ledger.load_account(contract.seller()).await?;

        let lock_sequence = sequence::estimate_lock_sequence(
            &ledger,
            now,
            network.submit_timeout_secs,
            params.expiry,
        )?;
        let escrow_balance = reserve::minimum_balance(params.underlying.asset.is_native(), network);

        let locked_escrow = AccountState {
            account_id: escrow_id,
            sequence: lock_sequence,
        };

        // 3. The two mutually exclusive exits
        let refund = self.build_refund(contract, &locked_escrow)?;
        let exercise = self.build_exercise(contract, &locked_escrow)?;

        let exercise_hash = envelope_hash(&exercise, &network.network_passphrase)?;
        let refund_hash = envelope_hash(&refund, &network.network_passphrase)?;

        // 4. Setup whitelists both and gives up the escrow key
        let mut setup = self.build_setup(
            contract,
            seller,
            &escrow_id,
            lock_sequence,
            escrow_balance,
            now,
            exercise_hash,
            refund_hash,
        )?;
        escrow.sign_envelope(&mut setup, &network.network_passphrase)?;

        info!(
            escrow = %escrow_id,
            lock_sequence,
            %escrow_balance,
            exercise = %hex::encode(exercise_hash),
            refund = %hex::encode(refund_hash),
            "built option transactions"
        );

        Ok(OptionTransactionSet {
            escrow_account_id: escrow_id,
            lock_sequence,
            escrow_balance,
            setup,
            exercise,
            refund,
        })
    }

    /// Seller reclaims the underlying once the exercise window has closed.
    fn build_refund(
        &self,
        contract: &OptionContract,
        escrow: &AccountState,
    ) -> Result<TransactionEnvelope, OptionError> {
        let params = contract.params();
        let seller = *contract.seller();
        let opens = unix_seconds(exercise_deadline(contract)?)?;

        let mut tx = TransactionBuilder::new(
            escrow.clone(),
            contract.network().base_fee,
            time_bounds(opens, 0),
        );
        tx.payment(None, seller, &params.underlying.asset, params.underlying.amount)?;
        if !params.underlying.asset.is_native() {
            tx.change_trust(None, &params.underlying.asset, Some(Decimal::ZERO))?;
        }
        tx.account_merge(None, seller);
        tx.build()
    }

    /// Buyer pays the strike and takes the underlying during the exercise window.
    ///
    /// Time bounds are inclusive on the ledger, so the window ends one second
    /// before the refund opens.
    fn build_exercise(
        &self,
        contract: &OptionContract,
        escrow: &AccountState,
    ) -> Result<TransactionEnvelope, OptionError> {
        let params = contract.params();
        let buyer = *contract.buyer();
        let seller = *contract.seller();

        let deadline = exercise_deadline(contract)?;
        let closes = unix_seconds(deadline)?
            .checked_sub(1)
            .filter(|last| *last > 0)
            .ok_or_else(|| OptionError::TimeOutOfRange(deadline.to_rfc3339()))?;

        let mut tx = TransactionBuilder::new(
            escrow.clone(),
            contract.network().base_fee,
            time_bounds(unix_seconds(params.expiry)?, closes),
        );
        tx.payment(Some(buyer), seller, &params.exercise.asset, params.exercise.amount)?;
        tx.payment(None, buyer, &params.underlying.asset, params.underlying.amount)?;
        if !params.underlying.asset.is_native() {
            tx.change_trust(None, &params.underlying.asset, Some(Decimal::ZERO))?;
        }
        tx.account_merge(None, seller);
        tx.build()
    }

    #[allow(clippy::too_many_arguments)]
    fn build_setup(
        &self,
        contract: &OptionContract,
        seller: AccountState,
        escrow_id: &AccountId,
        lock_sequence: i64,
        escrow_balance: Decimal,
        now: DateTime<Utc>,
        exercise_hash: [u8; 32],
        refund_hash: [u8; 32],
    ) -> Result<TransactionEnvelope, OptionError> {
        let params = contract.params();
        let network = contract.network();
        let escrow = Some(*escrow_id);
        let timeout = i64::try_from(network.submit_timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|timeout| now.checked_add_signed(timeout))
            .ok_or_else(|| {
                OptionError::TimeOutOfRange(format!(
                    "{}s after {}",
                    network.submit_timeout_secs, now
                ))
            })?;

        let mut tx = TransactionBuilder::new(
            seller,
            network.base_fee,
            time_bounds(0, unix_seconds(timeout)?),
        );
        tx.create_account(None, *escrow_id, escrow_balance)?;
        tx.bump_sequence(escrow, lock_sequence);
        if !params.underlying.asset.is_native() {
            tx.change_trust(escrow, &params.underlying.asset, None)?;
        }
        tx.payment(None, *escrow_id, &params.underlying.asset, params.underlying.amount)?;
        tx.payment(
            Some(*contract.buyer()),
            *contract.seller(),
            &params.premium.asset,
            params.premium.amount,
        )?;
        tx.add_pre_auth_signer(escrow, exercise_hash, 1);
        tx.add_pre_auth_signer(escrow, refund_hash, 1);
        tx.set_master_weight(escrow, 0);
        tx.build()
    }
}

fn exercise_deadline(contract: &OptionContract) -> Result<DateTime<Utc>, OptionError> {
    let params = contract.params();
    params
        .exercise_deadline()
        .ok_or_else(|| OptionError::TimeOutOfRange(params.expiry.to_rfc3339()))
}

fn unix_seconds(t: DateTime<Utc>) -> Result<u64, OptionError> {
    u64::try_from(t.timestamp()).map_err(|_| OptionError::TimeOutOfRange(t.to_rfc3339()))
}
