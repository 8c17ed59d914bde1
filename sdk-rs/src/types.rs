use std::fmt;

// re-export types in public API
pub use openbook_v2_light::{PlaceOrderArgs, PlaceOrderType, SelfTradeBehavior, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::{message::CompileError, pubkey::Pubkey, signer::SignerError};
use thiserror::Error;

pub type SdkResult<T> = Result<T, SdkError>;

/// Solana cluster the client targets
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Context {
    /// Target DevNet
    DevNet,
    /// Target MainNet
    MainNet,
}

/// Broad class of an `SdkError`, for callers that branch on the failure
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// endpoint unreachable, rate-limited or timed out
    Transport,
    /// market missing, balance too low, order not representable
    Domain,
    /// signer rejected or returned a tampered transaction
    Signing,
    /// invalid client configuration
    Config,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("rpc fail: {0}")]
    Rpc(#[from] ClientError),
    #[error("all {attempted} rpc endpoints failed")]
    AllEndpointsFailed { attempted: usize },
    #[error("could not fetch any balance")]
    NoBalance,
    #[error("market not found: {0}")]
    MarketNotFound(Pubkey),
    #[error("invalid lot size (base: {base_lot_size}, quote: {quote_lot_size})")]
    InvalidLotSize {
        base_lot_size: i64,
        quote_lot_size: i64,
    },
    #[error("invalid order parameters: {0}")]
    InvalidOrderParams(String),
    #[error("insufficient {symbol} balance: required {required}, available {available}")]
    InsufficientBalance {
        symbol: String,
        required: Decimal,
        available: Decimal,
    },
    #[error("market is expired")]
    MarketExpired,
    #[error("invalid openbook account")]
    InvalidAccount,
    #[error("error while deserializing")]
    Deserializing,
    #[error("tx simulation failed: {err}")]
    SimulationFailed { err: String, logs: Vec<String> },
    #[error("tx compile fail: {0}")]
    Compile(#[from] CompileError),
    #[error("signing fail: {0}")]
    Signing(#[from] SignerError),
    #[error("signer modified the transaction: {0}")]
    SignerTampered(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid config json: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),
    #[error("invalid keypair seed")]
    InvalidSeed,
}

impl SdkError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rpc(_) | Self::AllEndpointsFailed { .. } | Self::NoBalance => ErrorKind::Transport,
            Self::MarketNotFound(_)
            | Self::InvalidOrderParams(_)
            | Self::InsufficientBalance { .. }
            | Self::MarketExpired
            | Self::InvalidAccount
            | Self::Deserializing
            | Self::SimulationFailed { .. }
            | Self::Compile(_) => ErrorKind::Domain,
            Self::Signing(_) | Self::SignerTampered(_) => ErrorKind::Signing,
            Self::InvalidLotSize { .. }
            | Self::InvalidConfig(_)
            | Self::ConfigJson(_)
            | Self::InvalidKeypair(_)
            | Self::InvalidSeed => ErrorKind::Config,
        }
    }

    /// Returns true if the endpoint answered with HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Rpc(err) => match err.kind() {
                ClientErrorKind::Reqwest(err) => err.status().map(|s| s.as_u16()) == Some(429),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Order direction as entered by the user
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<OrderSide> for Side {
    fn from(value: OrderSide) -> Self {
        match value {
            OrderSide::Buy => Side::Bid,
            OrderSide::Sell => Side::Ask,
        }
    }
}

/// A human denominated order, e.g. buy 2.5 SOL at 150.25 USDC
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    /// Base token amount in UI units
    pub quantity: Decimal,
    /// Quote token per base token, in UI units
    pub price: Decimal,
}

impl OrderRequest {
    /// Create a buy order
    pub fn buy(quantity: Decimal, price: Decimal) -> Self {
        Self {
            side: OrderSide::Buy,
            quantity,
            price,
        }
    }
    /// Create a sell order
    pub fn sell(quantity: Decimal, price: Decimal) -> Self {
        Self {
            side: OrderSide::Sell,
            quantity,
            price,
        }
    }
    /// Amount of quote token the order can spend, before the safety margin
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

/// Token whose balance the client reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedToken {
    pub symbol: String,
    #[serde(with = "crate::config::pubkey_str")]
    pub mint: Pubkey,
    /// decimals reported when the wallet holds no account for the mint
    pub decimals: u8,
}

impl TrackedToken {
    pub fn new(symbol: &str, mint: Pubkey, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            mint,
            decimals,
        }
    }
}

/// A wallet balance of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    /// UI amount, never negative
    pub balance: Decimal,
    pub decimals: u8,
    /// mint address
    pub address: String,
}

/// Result of a balance read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub balances: Vec<TokenBalance>,
    /// true when token accounts could not be read and only the native balance is reported
    pub degraded: bool,
}

impl BalanceReport {
    /// Balance of `symbol`, zero when not reported
    pub fn balance_of(&self, symbol: &str) -> Decimal {
        self.balances
            .iter()
            .find(|b| b.symbol.eq_ignore_ascii_case(symbol))
            .map(|b| b.balance)
            .unwrap_or_default()
    }
}

/// Market metadata for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    pub market_address: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub program_id: String,
}

/// Best resting order of one book side
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLevel {
    pub price_lots: i64,
    pub size_lots: i64,
    /// UI price, quote per base
    pub price: Decimal,
    /// UI size in base token
    pub size: Decimal,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopOfBook {
    pub best_bid: Option<BookLevel>,
    pub best_ask: Option<BookLevel>,
}

impl TopOfBook {
    /// best ask - best bid, if both sides have orders
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}

/// Progress of an order submission
///
/// Stages only advance; a failure reports the last stage reached
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionStage {
    #[default]
    Idle,
    Throttling,
    ConnectionAcquired,
    MarketLoaded,
    ParametersComputed,
    Signed,
    Broadcast,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Throttling => "throttling",
            Self::ConnectionAcquired => "connection acquired",
            Self::MarketLoaded => "market loaded",
            Self::ParametersComputed => "parameters computed",
            Self::Signed => "signed",
            Self::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Order submission result for UI callers, never an `Err`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OrderOutcome {
    Submitted {
        signature: String,
    },
    Failed {
        stage: SubmissionStage,
        kind: ErrorKind,
        message: String,
    },
}

impl OrderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
    /// Message suitable for a toast
    pub fn message(&self) -> String {
        match self {
            Self::Submitted { signature } => format!("order submitted: {signature}"),
            Self::Failed { stage, message, .. } => format!("order failed ({stage}): {message}"),
        }
    }
}
