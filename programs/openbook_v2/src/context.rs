use crate::*;

#[derive(Accounts)]
pub struct CreateOpenOrdersIndexer<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,
    /// CHECK: owner of the indexer, signs through the payer when identical
    pub owner: UncheckedAccount<'info>,
    /// CHECK: PDA ["OpenOrdersIndexer", owner], initialised by the program
    #[account(mut)]
    pub open_orders_indexer: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct CreateOpenOrdersAccount<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,
    /// CHECK: owner of the new open orders account
    pub owner: UncheckedAccount<'info>,
    /// CHECK: optional delegate allowed to place/cancel on behalf of the owner
    pub delegate_account: Option<UncheckedAccount<'info>>,
    /// CHECK: owner's indexer, receives the new account address
    #[account(mut)]
    pub open_orders_indexer: UncheckedAccount<'info>,
    /// CHECK: PDA ["OpenOrders", owner, account_num], initialised by the program
    #[account(mut)]
    pub open_orders_account: UncheckedAccount<'info>,
    /// CHECK: market the account trades on
    pub market: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct PlaceOrder<'info> {
    pub signer: Signer<'info>,
    /// CHECK: owner's open orders account for `market`
    #[account(mut)]
    pub open_orders_account: UncheckedAccount<'info>,
    pub open_orders_admin: Option<Signer<'info>>,
    /// CHECK: token account paying for the order, quote for bids and base for asks
    #[account(mut)]
    pub user_token_account: UncheckedAccount<'info>,
    /// CHECK: the market
    #[account(mut)]
    pub market: UncheckedAccount<'info>,
    /// CHECK: bids book side of `market`
    #[account(mut)]
    pub bids: UncheckedAccount<'info>,
    /// CHECK: asks book side of `market`
    #[account(mut)]
    pub asks: UncheckedAccount<'info>,
    /// CHECK: event heap of `market`
    #[account(mut)]
    pub event_heap: UncheckedAccount<'info>,
    /// CHECK: market vault matching `user_token_account`
    #[account(mut)]
    pub market_vault: UncheckedAccount<'info>,
    /// CHECK: market oracle A, when configured
    pub oracle_a: Option<UncheckedAccount<'info>>,
    /// CHECK: market oracle B, when configured
    pub oracle_b: Option<UncheckedAccount<'info>>,
    /// CHECK: spl token program
    pub token_program: UncheckedAccount<'info>,
}
