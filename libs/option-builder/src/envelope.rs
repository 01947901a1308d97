//! Bridges option terms onto the network's XDR transaction types.
//!
//! Envelopes are plain `stellar_xdr::curr` values. This module converts
//! accounts and assets into them and computes the network-bound hash that
//! pre-authorized signers are checked against.

use option_model::Asset;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    self as xdr, AlphaNum12, AlphaNum4, AssetCode12, AssetCode4, ChangeTrustAsset, Hash, Limits,
    MuxedAccount, PublicKey, TimeBounds, TimePoint, Transaction, TransactionEnvelope,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, Uint256, WriteXdr,
};

use crate::types::OptionError;

/// An ed25519 account id, rendered as a `G...` strkey.
pub use stellar_strkey::ed25519::PublicKey as AccountId;

pub const MAX_OPERATIONS: usize = 100;

pub fn parse_account_id(raw: &str) -> Result<AccountId, OptionError> {
    AccountId::from_string(raw).map_err(|_| OptionError::InvalidAccountId(raw.to_string()))
}

pub fn muxed_account(id: &AccountId) -> MuxedAccount {
    MuxedAccount::Ed25519(Uint256(id.0))
}

pub fn ledger_account_id(id: &AccountId) -> xdr::AccountId {
    xdr::AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(id.0)))
}

/// Resolves an asset to its on-ledger form. Codes are 1 to 12 ASCII
/// alphanumerics; up to 4 characters use the short encoding.
pub fn ledger_asset(asset: &Asset) -> Result<xdr::Asset, OptionError> {
    let (code, issuer) = match asset {
        Asset::Native => return Ok(xdr::Asset::Native),
        Asset::Credit { code, issuer } => (code, issuer),
    };
    let valid = !code.is_empty() && code.len() <= 12 && code.bytes().all(|b| b.is_ascii_alphanumeric());
    if !valid {
        return Err(OptionError::InvalidAssetCode(code.clone()));
    }
    let issuer = ledger_account_id(&parse_account_id(issuer)?);
    if code.len() <= 4 {
        let mut padded = [0u8; 4];
        padded[..code.len()].copy_from_slice(code.as_bytes());
        Ok(xdr::Asset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(padded),
            issuer,
        }))
    } else {
        let mut padded = [0u8; 12];
        padded[..code.len()].copy_from_slice(code.as_bytes());
        Ok(xdr::Asset::CreditAlphanum12(AlphaNum12 {
            asset_code: AssetCode12(padded),
            issuer,
        }))
    }
}

pub fn trust_asset(asset: &Asset) -> Result<ChangeTrustAsset, OptionError> {
    Ok(match ledger_asset(asset)? {
        xdr::Asset::Native => ChangeTrustAsset::Native,
        xdr::Asset::CreditAlphanum4(a) => ChangeTrustAsset::CreditAlphanum4(a),
        xdr::Asset::CreditAlphanum12(a) => ChangeTrustAsset::CreditAlphanum12(a),
    })
}

/// Inclusive validity window; a `max_time` of zero leaves it open-ended.
pub fn time_bounds(min_time: u64, max_time: u64) -> TimeBounds {
    TimeBounds {
        min_time: TimePoint(min_time),
        max_time: TimePoint(max_time),
    }
}

pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}

/// SHA-256 of the network id, the envelope type and the transaction.
pub fn transaction_hash(tx: &Transaction, passphrase: &str) -> Result<[u8; 32], OptionError> {
    let payload = TransactionSignaturePayload {
        network_id: network_id(passphrase),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload.to_xdr(Limits::none())?;
    Ok(Sha256::digest(&bytes).into())
}

pub fn v1_envelope(envelope: &TransactionEnvelope) -> Result<&TransactionV1Envelope, OptionError> {
    match envelope {
        TransactionEnvelope::Tx(v1) => Ok(v1),
        _ => Err(OptionError::Xdr(xdr::Error::Unsupported)),
    }
}

pub fn envelope_hash(envelope: &TransactionEnvelope, passphrase: &str) -> Result<[u8; 32], OptionError> {
    transaction_hash(&v1_envelope(envelope)?.tx, passphrase)
}

/// Sequence the source account must hold for the envelope to apply.
pub fn account_sequence(envelope: &TransactionEnvelope) -> Result<i64, OptionError> {
    Ok(v1_envelope(envelope)?.tx.seq_num.0 - 1)
}

pub fn to_xdr_hex(envelope: &TransactionEnvelope) -> Result<String, OptionError> {
    Ok(hex::encode(envelope.to_xdr(Limits::none())?))
}

/// `T...` strkey of a pre-authorized transaction signer.
pub fn pre_auth_signer(tx_hash: [u8; 32]) -> String {
    stellar_strkey::PreAuthTx(tx_hash).to_string()
}
