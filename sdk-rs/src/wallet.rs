//! Transaction signing

use std::{future::Future, sync::Arc};

use futures_util::{future::BoxFuture, FutureExt};
use log::debug;
use solana_sdk::{
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::{keypair_from_seed, Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};

use crate::{
    types::{SdkError, SdkResult},
    utils,
};

/// Signs transactions on behalf of the trading wallet
///
/// The signer must only add signatures, the message (fee payer, instructions)
/// has to come back unchanged.
pub trait TransactionSigner: Send + Sync {
    /// The wallet address, used as fee payer and token account owner
    fn pubkey(&self) -> Pubkey;
    /// Sign one transaction
    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> BoxFuture<SdkResult<VersionedTransaction>>;
    /// Sign a batch of transactions, in order
    fn sign_all(
        &self,
        txs: Vec<VersionedTransaction>,
    ) -> BoxFuture<SdkResult<Vec<VersionedTransaction>>> {
        async move {
            let mut signed = Vec::with_capacity(txs.len());
            for tx in txs {
                signed.push(self.sign_transaction(tx).await?);
            }
            Ok(signed)
        }
        .boxed()
    }
}

/// Build a transaction with placeholder signatures for every required signer
pub fn unsigned_tx(message: VersionedMessage) -> VersionedTransaction {
    let required = message.header().num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message,
    }
}

/// Check a signer returned `unsigned` intact, signed by `signer`
pub fn verify_signed(
    unsigned: &VersionedTransaction,
    signed: &VersionedTransaction,
    signer: &Pubkey,
) -> SdkResult<()> {
    let fee_payer = |tx: &VersionedTransaction| tx.message.static_account_keys().first().copied();
    if fee_payer(signed) != fee_payer(unsigned) {
        return Err(SdkError::SignerTampered("fee payer changed"));
    }
    if signed.message.instructions() != unsigned.message.instructions()
        || signed.message.static_account_keys() != unsigned.message.static_account_keys()
    {
        return Err(SdkError::SignerTampered("instructions changed"));
    }
    if signed.message.recent_blockhash() != unsigned.message.recent_blockhash() {
        return Err(SdkError::SignerTampered("blockhash changed"));
    }

    let position = signed
        .message
        .static_account_keys()
        .iter()
        .take(signed.message.header().num_required_signatures as usize)
        .position(|key| key == signer)
        .ok_or(SdkError::SignerTampered("wallet is not a required signer"))?;
    let verified = signed.verify_with_results();
    if !verified.get(position).copied().unwrap_or(false) {
        return Err(SdkError::SignerTampered("missing or invalid wallet signature"));
    }

    Ok(())
}

/// Keypair backed signer
#[derive(Clone, Debug)]
pub struct Wallet {
    signer: Arc<Keypair>,
}

impl Wallet {
    /// Init wallet from a string that could be either a file path or the encoded key
    pub fn try_from_str(path_or_key: &str) -> SdkResult<Self> {
        let keypair = utils::load_keypair_multi_format(path_or_key)?;
        Ok(Self::new(keypair))
    }
    /// Init wallet from seed bytes
    pub fn from_seed(seed: &[u8]) -> SdkResult<Self> {
        let keypair: Keypair = keypair_from_seed(seed).map_err(|_| SdkError::InvalidSeed)?;
        Ok(Self::new(keypair))
    }
    pub fn new(keypair: Keypair) -> Self {
        Self {
            signer: Arc::new(keypair),
        }
    }
    /// Return the wallet address
    pub fn signer(&self) -> Pubkey {
        self.signer.pubkey()
    }
}

impl TransactionSigner for Wallet {
    fn pubkey(&self) -> Pubkey {
        self.signer()
    }

    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> BoxFuture<SdkResult<VersionedTransaction>> {
        let signed =
            VersionedTransaction::try_new(tx.message, &[self.signer.as_ref()]).map_err(Into::into);
        async move { signed }.boxed()
    }
}

type SignFn = dyn Fn(VersionedTransaction) -> BoxFuture<'static, SdkResult<VersionedTransaction>>
    + Send
    + Sync;

/// Signer delegating to a caller supplied callback, e.g. a browser or hardware wallet bridge
#[derive(Clone)]
pub struct CallbackSigner {
    pubkey: Pubkey,
    sign: Arc<SignFn>,
}

impl CallbackSigner {
    pub fn new<F, Fut>(pubkey: Pubkey, sign: F) -> Self
    where
        F: Fn(VersionedTransaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SdkResult<VersionedTransaction>> + Send + 'static,
    {
        Self {
            pubkey,
            sign: Arc::new(move |tx| sign(tx).boxed()),
        }
    }
}

impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for CallbackSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> BoxFuture<SdkResult<VersionedTransaction>> {
        debug!(target: "wallet", "requesting signature from {}", self.pubkey);
        (self.sign)(tx)
    }
}
