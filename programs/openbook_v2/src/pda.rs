//! Program derived addresses of the OpenBook v2 program

use anchor_lang::prelude::Pubkey;

use crate::constants::{OPEN_ORDERS_ACCOUNT_SEED, OPEN_ORDERS_INDEXER_SEED};

/// Address of `owner`'s open orders indexer
pub fn open_orders_indexer(owner: &Pubkey) -> Pubkey {
    let (address, _bump) =
        Pubkey::find_program_address(&[OPEN_ORDERS_INDEXER_SEED, owner.as_ref()], &crate::ID);
    address
}

/// Address of `owner`'s open orders account number `account_num` (1 based)
pub fn open_orders_account(owner: &Pubkey, account_num: u32) -> Pubkey {
    let (address, _bump) = Pubkey::find_program_address(
        &[
            OPEN_ORDERS_ACCOUNT_SEED,
            owner.as_ref(),
            &account_num.to_le_bytes(),
        ],
        &crate::ID,
    );
    address
}
