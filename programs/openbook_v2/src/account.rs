#![allow(dead_code)]

use anchor_lang::Discriminator;
use bytemuck::Zeroable;
use crate::*;

#[zero_copy]
#[derive(AnchorDeserialize, AnchorSerialize, Debug)]
pub struct OracleConfig {
    pub conf_filter: f64,
    pub max_staleness_slots: i64,
    pub reserved: [u8; 72],
}

#[account(zero_copy(unsafe))]
#[repr(packed)]
pub struct Market {
    /// PDA bump
    pub bump: u8,

    /// Number of decimals used for the base token.
    ///
    /// Used to convert the oracle's price into a native/native price.
    pub base_decimals: u8,
    pub quote_decimals: u8,

    pub padding1: [u8; 5],

    // Pda for signing vault txs
    pub market_authority: Pubkey,

    /// No expiry = 0. Market will expire and no trading allowed after time_expiry
    pub time_expiry: i64,

    /// Admin who can collect fees from the market
    pub collect_fee_admin: Pubkey,
    /// Admin who must sign off on all order creations
    pub open_orders_admin: NonZeroPubkeyOption,
    /// Admin who must sign off on all event consumptions
    pub consume_events_admin: NonZeroPubkeyOption,
    /// Admin who can set market expired, prune orders and close the market
    pub close_market_admin: NonZeroPubkeyOption,

    /// Name. Trailing zero bytes are ignored.
    pub name: [u8; 16],

    /// Address of the BookSide account for bids
    pub bids: Pubkey,
    /// Address of the BookSide account for asks
    pub asks: Pubkey,
    /// Address of the EventHeap account
    pub event_heap: Pubkey,

    /// Oracles account address
    pub oracle_a: NonZeroPubkeyOption,
    pub oracle_b: NonZeroPubkeyOption,
    /// Oracle configuration
    pub oracle_config: OracleConfig,

    /// Number of quote native in a quote lot. Must be a power of 10.
    ///
    /// A lot price of 1 is a native price of quote_lot_size/base_lot_size.
    pub quote_lot_size: i64,

    /// Number of base native in a base lot. Must be a power of 10.
    pub base_lot_size: i64,

    /// Total number of orders seen
    pub seq_num: u64,

    /// Timestamp in seconds that the market was registered at.
    pub registration_time: i64,

    /// Fee (in 10^-6) when matching maker orders.
    pub maker_fee: i64,
    /// Fee (in 10^-6) for taker orders, always >= 0.
    pub taker_fee: i64,

    pub fees_accrued: u128,
    pub fees_to_referrers: u128,
    pub referrer_rebates_accrued: u64,
    pub fees_available: u64,
    pub maker_volume: u128,
    pub taker_volume_wo_oo: u128,

    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,

    pub market_base_vault: Pubkey,
    pub base_deposit_total: u64,

    pub market_quote_vault: Pubkey,
    pub quote_deposit_total: u64,

    pub reserved: [u8; 128],
}

impl Market {
    /// Decode raw account data, `None` on a foreign discriminator or short data
    pub fn from_account_data(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[..8] != Self::discriminator() {
            return None;
        }
        let body = data[8..].get(..std::mem::size_of::<Self>())?;
        bytemuck::try_pod_read_unaligned(body).ok()
    }
}

/// Prefix of the program's open orders account, enough to identify owner and market
#[account]
pub struct OpenOrdersAccount {
    pub owner: Pubkey,
    pub market: Pubkey,
    pub name: [u8; 32],
    pub delegate: NonZeroPubkeyOption,
    pub account_num: u32,
    pub bump: u8,
}

/// Per-owner registry of every open orders account ever created
#[account]
pub struct OpenOrdersIndexer {
    pub bump: u8,
    pub created_counter: u32,
    pub addresses: Vec<Pubkey>,
}

impl OpenOrdersIndexer {
    /// `account_num` to use for the owner's next open orders account
    pub fn next_account_num(&self) -> u32 {
        self.created_counter.saturating_add(1)
    }
}

#[zero_copy]
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Default, PartialEq)]
pub struct NonZeroPubkeyOption {
    key: Pubkey,
}

impl PartialEq<NonZeroPubkeyOption> for Pubkey {
    fn eq(&self, other: &NonZeroPubkeyOption) -> bool {
        other.is_some() && *self == other.key
    }
}

impl PartialEq<Pubkey> for NonZeroPubkeyOption {
    fn eq(&self, other: &Pubkey) -> bool {
        self.is_some() && self.key == *other
    }
}

impl From<NonZeroPubkeyOption> for Option<Pubkey> {
    fn from(value: NonZeroPubkeyOption) -> Self {
        if value.is_some() {
            Some(value.key)
        } else {
            None
        }
    }
}

impl From<Option<Pubkey>> for NonZeroPubkeyOption {
    fn from(normal_option: Option<Pubkey>) -> Self {
        match normal_option {
            Some(key) => Self { key },
            None => Self::zeroed(),
        }
    }
}

impl NonZeroPubkeyOption {
    pub fn is_some(&self) -> bool {
        *self != Self::zeroed()
    }

    pub fn is_none(&self) -> bool {
        *self == Self::zeroed()
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOrderType {
    Limit,
    ImmediateOrCancel,
    PostOnly,
    Market,
    PostOnlySlide,
    FillOrKill,
}

/// What happens when an order would match another order of the same owner
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTradeBehavior {
    /// Both orders are decremented by the matched size, no fill event
    DecrementTake,
    /// The resting order is cancelled and matching continues
    CancelProvide,
    /// The whole transaction fails
    AbortTransaction,
}
