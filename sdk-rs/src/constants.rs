use std::time::Duration;

pub use openbook_v2_light::ID as PROGRAM_ID;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;

use crate::types::{Context, TrackedToken};

pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(1_000);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SAFETY_MARGIN: Decimal = dec!(1.10);
pub const DEFAULT_MATCH_LIMIT: u8 = 10;
pub const DEFAULT_OPEN_ORDERS_NAME: &str = "openbook-trade";

/// Lamports per SOL
pub const NATIVE_DECIMALS: u8 = 9;
/// Most accounts a single `getMultipleAccounts` request may ask for
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

pub const WSOL_MINT: Pubkey = solana_sdk::pubkey!("So11111111111111111111111111111111111111112");
pub const USDC_MINT: Pubkey = solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDT_MINT: Pubkey = solana_sdk::pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");
pub const DEVNET_USDC_MINT: Pubkey = solana_sdk::pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// OpenBook v2 SOL/USDC
pub const MAINNET_SOL_USDC_MARKET: Pubkey = solana_sdk::pubkey!("CFSMrBssNG8Ud1edW59jNLnq2cwrQ9uY5cM3wXmqRJj3");

/// Public rpc endpoints, in probe order
pub const fn rpc_endpoints(context: Context) -> &'static [&'static str] {
    match context {
        Context::DevNet => &["https://api.devnet.solana.com"],
        Context::MainNet => &[
            "https://api.mainnet-beta.solana.com",
            "https://solana-rpc.publicnode.com",
        ],
    }
}

/// Market traded when none is configured
///
/// There is no canonical DevNet market, callers must provide one
pub const fn default_market(context: Context) -> Option<Pubkey> {
    match context {
        Context::DevNet => None,
        Context::MainNet => Some(MAINNET_SOL_USDC_MARKET),
    }
}

/// Tokens whose balances are reported by default
pub fn tracked_tokens(context: Context) -> Vec<TrackedToken> {
    match context {
        Context::DevNet => vec![
            TrackedToken::new("SOL", WSOL_MINT, 9),
            TrackedToken::new("USDC", DEVNET_USDC_MINT, 6),
        ],
        Context::MainNet => vec![
            TrackedToken::new("SOL", WSOL_MINT, 9),
            TrackedToken::new("USDC", USDC_MINT, 6),
            TrackedToken::new("USDT", USDT_MINT, 6),
        ],
    }
}

/// Symbol of a known mint, if any
pub fn known_symbol(context: Context, mint: &Pubkey) -> Option<String> {
    tracked_tokens(context)
        .into_iter()
        .find(|t| t.mint == *mint)
        .map(|t| t.symbol)
}
