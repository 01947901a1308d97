use option_model::Asset;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stellar_xdr::curr::{
    BumpSequenceOp, ChangeTrustOp, CreateAccountOp, Memo, Operation, OperationBody, PaymentOp,
    Preconditions, SequenceNumber, SetOptionsOp, Signer, SignerKey, TimeBounds, Transaction,
    TransactionEnvelope, TransactionExt, TransactionV1Envelope, Uint256, VecM,
};

use crate::envelope::{
    ledger_account_id, ledger_asset, muxed_account, trust_asset, AccountId, MAX_OPERATIONS,
};
use crate::types::{AccountState, OptionError};

const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Converts a decimal amount into stroops, rejecting anything finer than 1e-7.
pub fn to_stroops(amount: Decimal) -> Result<i64, OptionError> {
    let scaled = amount
        .checked_mul(Decimal::from(STROOPS_PER_UNIT))
        .ok_or(OptionError::AmountPrecision(amount))?;
    if !scaled.fract().is_zero() {
        return Err(OptionError::AmountPrecision(amount));
    }
    scaled.to_i64().ok_or(OptionError::AmountPrecision(amount))
}

/// Appends operations, in call order, to a transaction for `source`.
///
/// The built transaction uses the source's next sequence number and a fee of
/// `base_fee` per operation.
pub struct TransactionBuilder {
    source: AccountState,
    base_fee: u32,
    time_bounds: TimeBounds,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    pub fn new(source: AccountState, base_fee: u32, time_bounds: TimeBounds) -> Self {
        Self {
            source,
            base_fee,
            time_bounds,
            operations: Vec::new(),
        }
    }

    fn push(&mut self, source: Option<AccountId>, body: OperationBody) -> &mut Self {
        self.operations.push(Operation {
            source_account: source.as_ref().map(muxed_account),
            body,
        });
        self
    }

    pub fn create_account(
        &mut self,
        source: Option<AccountId>,
        destination: AccountId,
        starting_balance: Decimal,
    ) -> Result<&mut Self, OptionError> {
        let starting_balance = to_stroops(starting_balance)?;
        Ok(self.push(
            source,
            OperationBody::CreateAccount(CreateAccountOp {
                destination: ledger_account_id(&destination),
                starting_balance,
            }),
        ))
    }

    pub fn bump_sequence(&mut self, source: Option<AccountId>, bump_to: i64) -> &mut Self {
        self.push(
            source,
            OperationBody::BumpSequence(BumpSequenceOp {
                bump_to: SequenceNumber(bump_to),
            }),
        )
    }

    /// A `limit` of `None` trusts up to the maximum; zero removes the trustline.
    pub fn change_trust(
        &mut self,
        source: Option<AccountId>,
        asset: &Asset,
        limit: Option<Decimal>,
    ) -> Result<&mut Self, OptionError> {
        let line = trust_asset(asset)?;
        let limit = match limit {
            Some(limit) => to_stroops(limit)?,
            None => i64::MAX,
        };
        Ok(self.push(source, OperationBody::ChangeTrust(ChangeTrustOp { line, limit })))
    }

    pub fn payment(
        &mut self,
        source: Option<AccountId>,
        destination: AccountId,
        asset: &Asset,
        amount: Decimal,
    ) -> Result<&mut Self, OptionError> {
        let asset = ledger_asset(asset)?;
        let amount = to_stroops(amount)?;
        Ok(self.push(
            source,
            OperationBody::Payment(PaymentOp {
                destination: muxed_account(&destination),
                asset,
                amount,
            }),
        ))
    }

    pub fn add_pre_auth_signer(
        &mut self,
        source: Option<AccountId>,
        tx_hash: [u8; 32],
        weight: u32,
    ) -> &mut Self {
        self.set_options(
            source,
            None,
            Some(Signer {
                key: SignerKey::PreAuthTx(Uint256(tx_hash)),
                weight,
            }),
        )
    }

    pub fn set_master_weight(&mut self, source: Option<AccountId>, weight: u32) -> &mut Self {
        self.set_options(source, Some(weight), None)
    }

    fn set_options(
        &mut self,
        source: Option<AccountId>,
        master_weight: Option<u32>,
        signer: Option<Signer>,
    ) -> &mut Self {
        self.push(
            source,
            OperationBody::SetOptions(SetOptionsOp {
                inflation_dest: None,
                clear_flags: None,
                set_flags: None,
                master_weight,
                low_threshold: None,
                med_threshold: None,
                high_threshold: None,
                home_domain: None,
                signer,
            }),
        )
    }

    pub fn account_merge(&mut self, source: Option<AccountId>, destination: AccountId) -> &mut Self {
        self.push(source, OperationBody::AccountMerge(muxed_account(&destination)))
    }

    pub fn build(&self) -> Result<TransactionEnvelope, OptionError> {
        let count = self.operations.len();
        if count == 0 || count > MAX_OPERATIONS {
            return Err(OptionError::OperationCount(count));
        }
        let seq_num = self
            .source
            .sequence
            .checked_add(1)
            .ok_or(OptionError::SequenceOutOfRange {
                height: (self.source.sequence >> 32) as u32,
                offset: 1,
            })?;
        let fee = u32::try_from(count)
            .ok()
            .and_then(|n| self.base_fee.checked_mul(n))
            .ok_or(OptionError::FeeOverflow {
                base_fee: self.base_fee,
                operations: count,
            })?;
        let tx = Transaction {
            source_account: muxed_account(&self.source.account_id),
            fee,
            seq_num: SequenceNumber(seq_num),
            cond: Preconditions::Time(self.time_bounds.clone()),
            memo: Memo::None,
            operations: self.operations.clone().try_into()?,
            ext: TransactionExt::V0,
        };
        Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: VecM::default(),
        }))
    }
}
