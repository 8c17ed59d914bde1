//! Client configuration
//!
//! Defaults come from [`crate::constants`] per [`Context`]; any field can be
//! overridden with the `with_*` setters or from JSON.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};

use crate::{
    connection::SelectionPolicy,
    constants::{self, DEFAULT_OPEN_ORDERS_NAME},
    types::{Context, PlaceOrderType, SdkError, SdkResult, SelfTradeBehavior, TrackedToken},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub context: Context,
    /// RPC endpoints, probed in order
    pub endpoints: Vec<String>,
    #[serde(with = "pubkey_str::option")]
    pub market: Option<Pubkey>,
    pub tracked_tokens: Vec<TrackedToken>,
    /// Minimum gap between two throttled operations
    #[serde(with = "duration_ms")]
    pub throttle_interval: Duration,
    /// Bound on a single endpoint liveness probe
    #[serde(with = "duration_ms")]
    pub probe_timeout: Duration,
    /// Bound on every other rpc request
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    pub commitment: CommitmentLevel,
    pub selection_policy: SelectionPolicy,
    /// Over-provisioning factor of the quote budget, covers fees and rounding
    pub safety_margin: Decimal,
    /// Max number of resting orders an order may match against
    pub match_limit: u8,
    #[serde(with = "SelfTradeBehaviorDef")]
    pub self_trade_behavior: SelfTradeBehavior,
    #[serde(with = "PlaceOrderTypeDef")]
    pub order_type: PlaceOrderType,
    /// Orders expire this many seconds after submission, `None` = good till cancelled
    pub order_ttl_secs: Option<u64>,
    /// Simulate the signed tx before broadcasting
    pub simulate: bool,
    /// Check the paying token balance before building the order
    pub balance_precheck: bool,
    /// Compute unit price in µ-lamports
    pub priority_fee: Option<u64>,
    /// Send legacy instead of v0 transactions
    pub legacy_transactions: bool,
    /// Name given to open orders accounts created by the client
    pub open_orders_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Context::MainNet)
    }
}

impl ClientConfig {
    /// Default configuration for `context`
    pub fn new(context: Context) -> Self {
        Self {
            context,
            endpoints: constants::rpc_endpoints(context)
                .iter()
                .map(ToString::to_string)
                .collect(),
            market: constants::default_market(context),
            tracked_tokens: constants::tracked_tokens(context),
            throttle_interval: constants::DEFAULT_THROTTLE_INTERVAL,
            probe_timeout: constants::DEFAULT_PROBE_TIMEOUT,
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
            commitment: CommitmentLevel::Confirmed,
            selection_policy: SelectionPolicy::default(),
            safety_margin: constants::DEFAULT_SAFETY_MARGIN,
            match_limit: constants::DEFAULT_MATCH_LIMIT,
            self_trade_behavior: SelfTradeBehavior::DecrementTake,
            order_type: PlaceOrderType::Limit,
            order_ttl_secs: None,
            simulate: false,
            balance_precheck: true,
            priority_fee: None,
            legacy_transactions: false,
            open_orders_name: DEFAULT_OPEN_ORDERS_NAME.to_string(),
        }
    }

    /// Parse a JSON config, missing fields take their `MainNet` default
    pub fn from_json(json: &str) -> SdkResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config is usable
    pub fn validate(&self) -> SdkResult<()> {
        if self.endpoints.is_empty() {
            return Err(SdkError::InvalidConfig("no rpc endpoints".into()));
        }
        if self.market.is_none() {
            return Err(SdkError::InvalidConfig("no market".into()));
        }
        if self.safety_margin <= Decimal::ZERO {
            return Err(SdkError::InvalidConfig(format!(
                "safety margin must be positive: {}",
                self.safety_margin
            )));
        }
        if self.match_limit == 0 {
            return Err(SdkError::InvalidConfig("match limit must be >= 1".into()));
        }
        if self.open_orders_name.len() > 32 {
            return Err(SdkError::InvalidConfig(
                "open orders name longer than 32 bytes".into(),
            ));
        }
        Ok(())
    }

    /// Set the rpc endpoints, in probe order
    pub fn with_endpoints<S: ToString>(mut self, endpoints: &[S]) -> Self {
        self.endpoints = endpoints.iter().map(ToString::to_string).collect();
        self
    }
    /// Set the market to trade on
    pub fn with_market(mut self, market: Pubkey) -> Self {
        self.market = Some(market);
        self
    }
    /// Set the tokens whose balances are read
    pub fn with_tracked_tokens(mut self, tokens: Vec<TrackedToken>) -> Self {
        self.tracked_tokens = tokens;
        self
    }
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }
    pub fn with_safety_margin(mut self, margin: Decimal) -> Self {
        self.safety_margin = margin;
        self
    }
    pub fn with_match_limit(mut self, limit: u8) -> Self {
        self.match_limit = limit;
        self
    }
    pub fn with_self_trade_behavior(mut self, behavior: SelfTradeBehavior) -> Self {
        self.self_trade_behavior = behavior;
        self
    }
    pub fn with_order_type(mut self, order_type: PlaceOrderType) -> Self {
        self.order_type = order_type;
        self
    }
    /// Expire orders `ttl` after submission
    pub fn with_order_ttl(mut self, ttl: Duration) -> Self {
        self.order_ttl_secs = Some(ttl.as_secs());
        self
    }
    pub fn with_simulation(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }
    pub fn with_balance_precheck(mut self, precheck: bool) -> Self {
        self.balance_precheck = precheck;
        self
    }
    /// Set the compute unit price in µ-lamports
    pub fn with_priority_fee(mut self, priority_fee: u64) -> Self {
        self.priority_fee = Some(priority_fee);
        self
    }
    pub fn with_legacy_transactions(mut self, legacy: bool) -> Self {
        self.legacy_transactions = legacy;
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "SelfTradeBehavior")]
enum SelfTradeBehaviorDef {
    DecrementTake,
    CancelProvide,
    AbortTransaction,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "PlaceOrderType")]
enum PlaceOrderTypeDef {
    Limit,
    ImmediateOrCancel,
    PostOnly,
    Market,
    PostOnlySlide,
    FillOrKill,
}

/// (de)serialize a `Pubkey` as its base58 string
pub(crate) mod pubkey_str {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.collect_str(key),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| Pubkey::from_str(&s).map_err(D::Error::custom))
                .transpose()
        }
    }
}

/// (de)serialize a `Duration` as integer milliseconds
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
