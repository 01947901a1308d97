use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
use stellar_xdr::curr::{self as xdr, DecoratedSignature, SignatureHint, TransactionEnvelope};

use crate::envelope::{transaction_hash, AccountId};
use crate::types::OptionError;

/// Single-use key pair of an escrow account that does not exist yet.
///
/// Its only job is to co-sign the setup transaction; setup then zeroes the
/// master weight, so the key is worthless afterwards.
pub struct EscrowSigner {
    keypair: Keypair,
}

impl EscrowSigner {
    pub fn generate() -> Result<Self, OptionError> {
        let seed: [u8; 32] = rand::random();
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8]) -> Result<Self, OptionError> {
        let secret = SecretKey::from_bytes(seed)
            .map_err(|e| OptionError::Signing(format!("invalid escrow seed: {}", e)))?;
        let public = PublicKey::from(&secret);
        Ok(Self {
            keypair: Keypair { secret, public },
        })
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(self.keypair.public.to_bytes())
    }

    /// Appends a decorated signature over the envelope's network hash.
    pub fn sign_envelope(
        &self,
        envelope: &mut TransactionEnvelope,
        network_passphrase: &str,
    ) -> Result<(), OptionError> {
        let TransactionEnvelope::Tx(v1) = envelope else {
            return Err(OptionError::Signing("only v1 envelopes are signed".to_string()));
        };
        let hash = transaction_hash(&v1.tx, network_passphrase)?;
        let signature = self.keypair.sign(&hash);
        let public = self.keypair.public.to_bytes();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&public[28..]);

        let mut signatures = v1.signatures.to_vec();
        signatures.push(DecoratedSignature {
            hint: SignatureHint(hint),
            signature: xdr::Signature(signature.to_bytes().to_vec().try_into()?),
        });
        v1.signatures = signatures.try_into()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TransactionBuilder;
    use crate::envelope::{envelope_hash, time_bounds, v1_envelope};
    use crate::types::AccountState;
    use ed25519_dalek::Verifier;

    #[test]
    fn signature_verifies_against_transaction_hash() {
        let signer = EscrowSigner::from_seed(&[7u8; 32]).unwrap();
        let mut builder = TransactionBuilder::new(
            AccountState {
                account_id: signer.account_id(),
                sequence: 0,
            },
            100,
            time_bounds(0, 0),
        );
        builder.bump_sequence(None, 2);
        let mut envelope = builder.build().unwrap();
        signer
            .sign_envelope(&mut envelope, option_model::TEST_NETWORK_PASSPHRASE)
            .unwrap();

        let sig = &v1_envelope(&envelope).unwrap().signatures[0];
        let public = PublicKey::from_bytes(&signer.account_id().0).unwrap();
        assert_eq!(&sig.hint.0, &signer.account_id().0[28..]);
        let parsed = ed25519_dalek::Signature::try_from(&sig.signature.0[..]).unwrap();
        let hash = envelope_hash(&envelope, option_model::TEST_NETWORK_PASSPHRASE).unwrap();
        assert!(public.verify(&hash, &parsed).is_ok());
    }

    #[test]
    fn generated_keys_differ() {
        let a = EscrowSigner::generate().unwrap();
        let b = EscrowSigner::generate().unwrap();
        assert_ne!(a.account_id(), b.account_id());
    }
}
