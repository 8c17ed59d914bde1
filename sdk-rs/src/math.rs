//! Conversion of human order amounts into OpenBook lots

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use openbook_v2_light::{Market, NonZeroPubkeyOption};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use solana_sdk::pubkey::Pubkey;

use crate::types::{
    OrderRequest, PlaceOrderArgs, PlaceOrderType, SdkError, SdkResult, SelfTradeBehavior, Side,
};

/// The market fields order math and instruction building need
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarketDescriptor {
    pub address: Pubkey,
    pub program_id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    /// base native units per base lot
    pub base_lot_size: i64,
    /// quote native units per quote lot
    pub quote_lot_size: i64,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_heap: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub oracle_a: Option<Pubkey>,
    pub oracle_b: Option<Pubkey>,
    pub open_orders_admin: Option<Pubkey>,
    /// unix seconds, 0 = never
    pub time_expiry: i64,
}

impl MarketDescriptor {
    /// Build from decoded market account data
    ///
    /// Fails with `InvalidLotSize` if either lot size is not positive
    pub fn from_market(address: Pubkey, market: &Market) -> SdkResult<Self> {
        // packed struct, copy fields out before use
        let base_lot_size = market.base_lot_size;
        let quote_lot_size = market.quote_lot_size;
        if base_lot_size <= 0 || quote_lot_size <= 0 {
            return Err(SdkError::InvalidLotSize {
                base_lot_size,
                quote_lot_size,
            });
        }
        let option = |key: NonZeroPubkeyOption| -> Option<Pubkey> { key.into() };

        Ok(Self {
            address,
            program_id: openbook_v2_light::ID,
            base_mint: market.base_mint,
            quote_mint: market.quote_mint,
            base_decimals: market.base_decimals,
            quote_decimals: market.quote_decimals,
            base_lot_size,
            quote_lot_size,
            bids: market.bids,
            asks: market.asks,
            event_heap: market.event_heap,
            base_vault: market.market_base_vault,
            quote_vault: market.market_quote_vault,
            oracle_a: option(market.oracle_a),
            oracle_b: option(market.oracle_b),
            open_orders_admin: option(market.open_orders_admin),
            time_expiry: market.time_expiry,
        })
    }

    /// Mint paid into the market by an order on `side`
    pub fn paying_mint(&self, side: Side) -> Pubkey {
        match side {
            Side::Bid => self.quote_mint,
            Side::Ask => self.base_mint,
        }
    }

    /// Market vault receiving the payment of an order on `side`
    pub fn vault_for(&self, side: Side) -> Pubkey {
        match side {
            Side::Bid => self.quote_vault,
            Side::Ask => self.base_vault,
        }
    }

    pub fn is_expired(&self, now_ts: i64) -> bool {
        self.time_expiry != 0 && now_ts >= self.time_expiry
    }

    /// Lot price of a UI `price` (quote per base)
    ///
    /// A lot price of 1 is a native price of `quote_lot_size / base_lot_size`,
    /// the result is clamped to at least 1 lot.
    pub fn price_lots(&self, price: Decimal) -> SdkResult<i64> {
        non_negative(price, "price")?;
        let native_price = price
            .checked_mul(pow10(self.quote_decimals)?)
            .and_then(|p| p.checked_div(pow10(self.base_decimals).ok()?))
            .ok_or_else(|| overflow("price"))?;
        let lots = native_price
            .checked_mul(Decimal::from(self.base_lot_size))
            .and_then(|p| p.checked_div(Decimal::from(self.quote_lot_size)))
            .ok_or_else(|| overflow("price"))?;

        Ok(to_i64(lots.floor(), "price")?.max(1))
    }

    /// Base lots of a UI `quantity`, rounded down
    pub fn max_base_lots(&self, quantity: Decimal) -> SdkResult<i64> {
        let native = ui_to_native(quantity, self.base_decimals)?;
        to_i64(
            Decimal::from(native / self.base_lot_size as u64),
            "quantity",
        )
    }

    /// Quote lots to budget for `quantity` at `price`, scaled by `safety_margin`
    pub fn max_quote_lots(
        &self,
        price: Decimal,
        quantity: Decimal,
        safety_margin: Decimal,
    ) -> SdkResult<i64> {
        non_negative(price, "price")?;
        non_negative(quantity, "quantity")?;
        let native = price
            .checked_mul(quantity)
            .and_then(|n| n.checked_mul(pow10(self.quote_decimals).ok()?))
            .and_then(|n| n.checked_mul(safety_margin))
            .ok_or_else(|| overflow("quote budget"))?;
        let lots = native
            .checked_div(Decimal::from(self.quote_lot_size))
            .ok_or_else(|| overflow("quote budget"))?;

        to_i64(lots.floor(), "quote budget")
    }

    /// UI price of a lot price
    pub fn price_from_lots(&self, price_lots: i64) -> SdkResult<Decimal> {
        let native_price = Decimal::from(price_lots)
            .checked_mul(Decimal::from(self.quote_lot_size))
            .and_then(|p| p.checked_div(Decimal::from(self.base_lot_size)))
            .ok_or_else(|| overflow("book price"))?;
        native_price
            .checked_mul(pow10(self.base_decimals)?)
            .and_then(|p| p.checked_div(pow10(self.quote_decimals).ok()?))
            .map(|d| d.normalize())
            .ok_or_else(|| overflow("book price"))
    }

    /// UI base quantity of a lot amount
    pub fn quantity_from_lots(&self, base_lots: i64) -> SdkResult<Decimal> {
        let native = Decimal::from(base_lots)
            .checked_mul(Decimal::from(self.base_lot_size))
            .ok_or_else(|| overflow("book quantity"))?;
        native_to_ui(native, self.base_decimals)
    }
}

/// Everything besides the request itself that goes into an order
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    pub safety_margin: Decimal,
    pub match_limit: u8,
    pub self_trade_behavior: SelfTradeBehavior,
    pub order_type: PlaceOrderType,
    pub client_order_id: u64,
    /// unix seconds, 0 = no expiry
    pub expiry_timestamp: u64,
}

/// Compute the `place_order` arguments of `request` on `market`
pub fn build_place_order_args(
    market: &MarketDescriptor,
    request: &OrderRequest,
    settings: &OrderSettings,
) -> SdkResult<PlaceOrderArgs> {
    let price_lots = market.price_lots(request.price)?;
    let max_base_lots = market.max_base_lots(request.quantity)?;
    let max_quote_lots_including_fees =
        market.max_quote_lots(request.price, request.quantity, settings.safety_margin)?;

    if max_base_lots == 0 {
        return Err(SdkError::InvalidOrderParams(format!(
            "quantity {} is below one base lot",
            request.quantity
        )));
    }
    if max_quote_lots_including_fees == 0 {
        return Err(SdkError::InvalidOrderParams(format!(
            "order value {} x {} is below one quote lot",
            request.quantity, request.price
        )));
    }

    Ok(PlaceOrderArgs {
        side: request.side.into(),
        price_lots,
        max_base_lots,
        max_quote_lots_including_fees,
        client_order_id: settings.client_order_id,
        order_type: settings.order_type,
        expiry_timestamp: settings.expiry_timestamp,
        self_trade_behavior: settings.self_trade_behavior,
        limit: settings.match_limit,
    })
}

/// Source of process unique client order ids
///
/// Seeded from the millisecond clock so ids do not repeat across restarts
#[derive(Debug)]
pub struct ClientOrderIds {
    next: AtomicU64,
}

impl Default for ClientOrderIds {
    fn default() -> Self {
        Self::starting_at(unix_millis())
    }
}

impl ClientOrderIds {
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Expiry timestamp for an order placed at `now_ts` living `ttl_secs`
pub fn expiry_timestamp(now_ts: u64, ttl_secs: Option<u64>) -> u64 {
    match ttl_secs {
        Some(ttl) if ttl > 0 => now_ts.saturating_add(ttl),
        _ => 0,
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub(crate) fn unix_secs() -> u64 {
    unix_millis() / 1_000
}

/// Convert a native (base unit) amount to UI units
///
/// Fails on decimals beyond what a `u64` scale can hold
pub fn native_to_ui(amount: Decimal, decimals: u8) -> SdkResult<Decimal> {
    amount
        .checked_div(pow10(decimals)?)
        .map(|d| d.normalize())
        .ok_or_else(|| overflow("amount"))
}

/// Convert a UI amount to native units, rounded down
pub fn ui_to_native(amount: Decimal, decimals: u8) -> SdkResult<u64> {
    non_negative(amount, "amount")?;
    let native = amount
        .checked_mul(pow10(decimals)?)
        .ok_or_else(|| overflow("amount"))?
        .floor();
    native.to_u64().ok_or_else(|| overflow("amount"))
}

fn pow10(decimals: u8) -> SdkResult<Decimal> {
    10_u64
        .checked_pow(decimals as u32)
        .map(Decimal::from)
        .ok_or_else(|| SdkError::InvalidOrderParams(format!("unsupported decimals: {decimals}")))
}

fn non_negative(value: Decimal, what: &str) -> SdkResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(SdkError::InvalidOrderParams(format!(
            "{what} must not be negative: {value}"
        )));
    }
    Ok(())
}

fn to_i64(value: Decimal, what: &str) -> SdkResult<i64> {
    value.to_i64().ok_or_else(|| overflow(what))
}

fn overflow(what: &str) -> SdkError {
    SdkError::InvalidOrderParams(format!("{what} out of range"))
}
