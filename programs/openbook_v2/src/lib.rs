use anchor_lang::prelude::{
    borsh::{BorshDeserialize, BorshSerialize},
    *,
};
use crate::context::{CreateOpenOrdersAccount, CreateOpenOrdersIndexer, PlaceOrder};

declare_id!("opnb2LAfJYbRMAHHvqjCwQxanZn7ReEHp1k81EohpZb");

pub mod account;
pub mod book;
pub mod constants;
pub mod context;
pub mod pda;

pub use crate::account::*;
pub use crate::book::*;
pub use crate::constants::*;
pub use crate::context::*;

/// Instruction surface of the on-chain program.
///
/// Handlers are never executed from this crate; they exist so anchor generates
/// `instruction::*` (data) and `accounts::*` (metas) builders for clients.
#[program]
mod openbook_v2 {
    #![allow(dead_code)]
    #![allow(unused_variables)]
    #![allow(clippy::too_many_arguments)]

    use super::*;

    pub(crate) fn create_open_orders_indexer(ctx: Context<CreateOpenOrdersIndexer>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn create_open_orders_account(
        ctx: Context<CreateOpenOrdersAccount>,
        name: String,
    ) -> Result<()> {
        Ok(())
    }

    pub(crate) fn place_order(
        ctx: Context<PlaceOrder>,
        side: Side,
        price_lots: i64,
        max_base_lots: i64,
        max_quote_lots_including_fees: i64,
        client_order_id: u64,
        order_type: PlaceOrderType,
        expiry_timestamp: u64,
        self_trade_behavior: SelfTradeBehavior,
        limit: u8,
    ) -> Result<()> {
        Ok(())
    }
}

/// Arguments of a `place_order` instruction, lot denominated
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceOrderArgs {
    pub side: Side,
    /// Price in quote lots per base lot, always >= 1
    pub price_lots: i64,
    /// Max number of base lots to buy or sell
    pub max_base_lots: i64,
    /// Max quote lots to pay or receive, fees included
    pub max_quote_lots_including_fees: i64,
    /// User defined id, echoed back in fill events
    pub client_order_id: u64,
    pub order_type: PlaceOrderType,
    /// Unix timestamp in seconds, 0 = no expiry
    pub expiry_timestamp: u64,
    pub self_trade_behavior: SelfTradeBehavior,
    /// Max number of orders to match against
    pub limit: u8,
}

impl From<PlaceOrderArgs> for instruction::PlaceOrder {
    fn from(args: PlaceOrderArgs) -> Self {
        instruction::PlaceOrder {
            side: args.side,
            price_lots: args.price_lots,
            max_base_lots: args.max_base_lots,
            max_quote_lots_including_fees: args.max_quote_lots_including_fees,
            client_order_id: args.client_order_id,
            order_type: args.order_type,
            expiry_timestamp: args.expiry_timestamp,
            self_trade_behavior: args.self_trade_behavior,
            limit: args.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::{Discriminator, InstructionData};

    use super::*;

    #[test]
    fn place_order_data_is_discriminator_then_borsh_args() {
        let args = PlaceOrderArgs {
            side: Side::Bid,
            price_lots: 150_000,
            max_base_lots: 1_000,
            max_quote_lots_including_fees: 500_000_000,
            client_order_id: 7,
            order_type: PlaceOrderType::Limit,
            expiry_timestamp: 0,
            self_trade_behavior: SelfTradeBehavior::DecrementTake,
            limit: 10,
        };
        let data = instruction::PlaceOrder::from(args).data();

        assert_eq!(&data[..8], &instruction::PlaceOrder::discriminator());
        assert_eq!(&data[8..], &args.try_to_vec().unwrap());
        // side + 3 * i64 + u64 + order type + u64 + self trade + u8
        assert_eq!(data.len(), 8 + 1 + 24 + 8 + 1 + 8 + 1 + 1);
    }

    #[test]
    fn create_open_orders_account_encodes_name() {
        let data = instruction::CreateOpenOrdersAccount {
            name: "trader".to_string(),
        }
        .data();
        // borsh string: u32 length prefix then bytes
        assert_eq!(&data[8..12], &6_u32.to_le_bytes());
        assert_eq!(&data[12..], b"trader");
    }
}
