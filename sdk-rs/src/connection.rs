//! RPC access: the `RpcSurface` the client talks through and endpoint selection

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anchor_lang::AccountDeserialize;
use anchor_spl::token::TokenAccount;
use futures_util::{future::BoxFuture, FutureExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use solana_account_decoder::{parse_token::UiTokenAmount, UiAccountData};
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_request::TokenAccountsFilter,
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};

use crate::types::{SdkError, SdkResult};

/// Which token accounts of an owner to list
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenAccountQuery {
    /// accounts holding `mint`
    Mint(Pubkey),
    /// every account owned by the token program
    ProgramId(Pubkey),
}

/// A token account as reported by the rpc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
    /// raw amount in base units
    pub amount: u64,
    pub decimals: u8,
}

/// The RPC calls the client makes
///
/// Implemented for the nonblocking `RpcClient`; tests provide stubs
pub trait RpcSurface: 'static + Send + Sync {
    // TODO: async fn when it stabilizes
    /// Cheap liveness call, returns the current slot
    fn probe(&self) -> BoxFuture<SdkResult<u64>>;
    /// Fetch `account`, `None` if it does not exist
    fn fetch_account(&self, account: Pubkey) -> BoxFuture<SdkResult<Option<Account>>>;
    /// Fetch several accounts in one request, preserving order
    fn fetch_accounts(&self, accounts: Vec<Pubkey>) -> BoxFuture<SdkResult<Vec<Option<Account>>>>;
    fn latest_blockhash(&self) -> BoxFuture<SdkResult<Hash>>;
    /// Simulate `tx`, failing with `SdkError::SimulationFailed` if it would not land
    fn simulate(&self, tx: VersionedTransaction) -> BoxFuture<SdkResult<()>>;
    /// Send `tx` to the cluster, returning its signature
    fn broadcast(&self, tx: VersionedTransaction) -> BoxFuture<SdkResult<Signature>>;
    /// Native balance in lamports
    fn native_balance(&self, owner: Pubkey) -> BoxFuture<SdkResult<u64>>;
    /// Token accounts of `owner` matching `query`
    fn token_accounts(
        &self,
        owner: Pubkey,
        query: TokenAccountQuery,
    ) -> BoxFuture<SdkResult<Vec<ParsedTokenAccount>>>;
}

impl RpcSurface for RpcClient {
    fn probe(&self) -> BoxFuture<SdkResult<u64>> {
        async move { self.get_slot().await.map_err(Into::into) }.boxed()
    }

    fn fetch_account(&self, account: Pubkey) -> BoxFuture<SdkResult<Option<Account>>> {
        async move {
            let response = self
                .get_account_with_commitment(&account, self.commitment())
                .await?;
            Ok(response.value)
        }
        .boxed()
    }

    fn fetch_accounts(&self, accounts: Vec<Pubkey>) -> BoxFuture<SdkResult<Vec<Option<Account>>>> {
        async move {
            self.get_multiple_accounts(&accounts)
                .await
                .map_err(Into::into)
        }
        .boxed()
    }

    fn latest_blockhash(&self) -> BoxFuture<SdkResult<Hash>> {
        async move { self.get_latest_blockhash().await.map_err(Into::into) }.boxed()
    }

    fn simulate(&self, tx: VersionedTransaction) -> BoxFuture<SdkResult<()>> {
        async move {
            let result = self.simulate_transaction(&tx).await?.value;
            match result.err {
                Some(err) => Err(SdkError::SimulationFailed {
                    err: err.to_string(),
                    logs: result.logs.unwrap_or_default(),
                }),
                None => Ok(()),
            }
        }
        .boxed()
    }

    fn broadcast(&self, tx: VersionedTransaction) -> BoxFuture<SdkResult<Signature>> {
        async move { self.send_transaction(&tx).await.map_err(Into::into) }.boxed()
    }

    fn native_balance(&self, owner: Pubkey) -> BoxFuture<SdkResult<u64>> {
        async move { self.get_balance(&owner).await.map_err(Into::into) }.boxed()
    }

    fn token_accounts(
        &self,
        owner: Pubkey,
        query: TokenAccountQuery,
    ) -> BoxFuture<SdkResult<Vec<ParsedTokenAccount>>> {
        async move {
            let filter = match query {
                TokenAccountQuery::Mint(mint) => TokenAccountsFilter::Mint(mint),
                TokenAccountQuery::ProgramId(program) => TokenAccountsFilter::ProgramId(program),
            };
            let accounts = self.get_token_accounts_by_owner(&owner, filter).await?;
            accounts.iter().map(parse_token_account).collect()
        }
        .boxed()
    }
}

/// Fields of a `jsonParsed` token account we rely on
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTokenInfo {
    mint: String,
    token_amount: UiTokenAmount,
}

#[derive(Deserialize)]
struct ParsedTokenData {
    info: ParsedTokenInfo,
}

/// Decode a keyed token account from either `jsonParsed` or binary encoding
fn parse_token_account(keyed: &RpcKeyedAccount) -> SdkResult<ParsedTokenAccount> {
    let address = Pubkey::from_str(&keyed.pubkey).map_err(|_| SdkError::Deserializing)?;
    match &keyed.account.data {
        UiAccountData::Json(parsed) => {
            let data: ParsedTokenData = serde_json::from_value(parsed.parsed.clone())
                .map_err(|_| SdkError::Deserializing)?;
            let amount = data.info.token_amount;
            Ok(ParsedTokenAccount {
                address,
                mint: Pubkey::from_str(&data.info.mint).map_err(|_| SdkError::Deserializing)?,
                amount: amount.amount.parse().map_err(|_| SdkError::Deserializing)?,
                decimals: amount.decimals,
            })
        }
        _ => {
            // binary encodings carry no decimals
            let account: Account = keyed.account.decode().ok_or(SdkError::Deserializing)?;
            let token = TokenAccount::try_deserialize(&mut account.data.as_ref())
                .map_err(|_| SdkError::InvalidAccount)?;
            Ok(ParsedTokenAccount {
                address,
                mint: token.mint,
                amount: token.amount,
                decimals: 0,
            })
        }
    }
}

/// Builds the `RpcSurface` of an endpoint
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Arc<dyn RpcSurface>;
}

/// Connects over http(s) with the nonblocking `RpcClient`
#[derive(Debug, Clone)]
pub struct HttpConnector {
    request_timeout: Duration,
    commitment: CommitmentConfig,
}

impl HttpConnector {
    pub fn new(request_timeout: Duration, commitment: CommitmentConfig) -> Self {
        Self {
            request_timeout,
            commitment,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &str) -> Arc<dyn RpcSurface> {
        Arc::new(RpcClient::new_with_timeout_and_commitment(
            endpoint.to_string(),
            self.request_timeout,
            self.commitment,
        ))
    }
}

/// A live endpoint
#[derive(Clone)]
pub struct Connection {
    pub endpoint: String,
    pub rpc: Arc<dyn RpcSurface>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// How `ConnectionSelector::select` chooses among endpoints
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionPolicy {
    /// Probe from the top of the list on every selection
    #[default]
    Reprobe,
    /// Probe the last good endpoint first, fall back to the ordered list when it fails
    Sticky,
}

const NO_ENDPOINT: usize = usize::MAX;

/// Picks the first endpoint, in configured order, answering a liveness probe
pub struct ConnectionSelector {
    candidates: Vec<Connection>,
    probe_timeout: Duration,
    policy: SelectionPolicy,
    /// index of the last selected endpoint (`Sticky` only)
    last_good: AtomicUsize,
}

impl ConnectionSelector {
    /// Create a selector over `endpoints`, fails if the list is empty
    pub fn new<S: AsRef<str>>(
        endpoints: &[S],
        connector: &dyn Connector,
        probe_timeout: Duration,
        policy: SelectionPolicy,
    ) -> SdkResult<Self> {
        if endpoints.is_empty() {
            return Err(SdkError::InvalidConfig("no rpc endpoints".into()));
        }
        let candidates = endpoints
            .iter()
            .map(|endpoint| Connection {
                endpoint: endpoint.as_ref().to_string(),
                rpc: connector.connect(endpoint.as_ref()),
            })
            .collect();

        Ok(Self {
            candidates,
            probe_timeout,
            policy,
            last_good: AtomicUsize::new(NO_ENDPOINT),
        })
    }

    /// Return a connection to a live endpoint
    ///
    /// Every endpoint is probed at most once per call, endpoints after the
    /// first live one are not probed.
    pub async fn select(&self) -> SdkResult<Connection> {
        let mut tried = NO_ENDPOINT;
        if self.policy == SelectionPolicy::Sticky {
            let last_good = self.last_good.load(Ordering::Acquire);
            if let Some(candidate) = self.candidates.get(last_good) {
                if self.probe(candidate).await {
                    return Ok(candidate.clone());
                }
                tried = last_good;
            }
        }

        for (idx, candidate) in self.candidates.iter().enumerate() {
            if idx == tried {
                continue;
            }
            if self.probe(candidate).await {
                if self.policy == SelectionPolicy::Sticky {
                    self.last_good.store(idx, Ordering::Release);
                }
                return Ok(candidate.clone());
            }
        }

        self.last_good.store(NO_ENDPOINT, Ordering::Release);
        Err(SdkError::AllEndpointsFailed {
            attempted: self.candidates.len(),
        })
    }

    async fn probe(&self, candidate: &Connection) -> bool {
        match tokio::time::timeout(self.probe_timeout, candidate.rpc.probe()).await {
            Ok(Ok(slot)) => {
                debug!(target: "connection", "{} alive at slot {slot}", candidate.endpoint);
                true
            }
            Ok(Err(err)) => {
                if err.is_rate_limited() {
                    warn!(target: "connection", "{} rate limited", candidate.endpoint);
                } else {
                    warn!(target: "connection", "{} probe failed: {err}", candidate.endpoint);
                }
                false
            }
            Err(_) => {
                warn!(
                    target: "connection",
                    "{} probe timed out after {:?}", candidate.endpoint, self.probe_timeout
                );
                false
            }
        }
    }
}
