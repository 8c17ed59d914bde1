//! Wallet balance reads with tiered fallbacks
//!
//! 1. per tracked token, the owner's token accounts for its mint (missing = 0)
//! 2. if that fails, only the native SOL balance, flagged `degraded`
//!
//! When every tracked balance is zero a broad scan of the owner's token
//! accounts is logged to help diagnose a wrong wallet or token list.

use log::{debug, info, warn};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::{
    connection::{RpcSurface, TokenAccountQuery},
    constants::{NATIVE_DECIMALS, WSOL_MINT},
    math::native_to_ui,
    types::{BalanceReport, SdkError, SdkResult, TokenBalance, TrackedToken},
};

/// Read the balances of `tokens` held by `owner`
pub async fn read_balances(
    rpc: &dyn RpcSurface,
    owner: &Pubkey,
    tokens: &[TrackedToken],
) -> SdkResult<BalanceReport> {
    match tracked_balances(rpc, owner, tokens).await {
        Ok(balances) => {
            if balances.iter().all(|b| b.balance.is_zero()) {
                scan_token_accounts(rpc, owner).await;
            }
            Ok(BalanceReport {
                balances,
                degraded: false,
            })
        }
        Err(err) => {
            warn!(target: "balances", "token balances unavailable, falling back to native: {err}");
            match rpc.native_balance(*owner).await {
                Ok(lamports) => Ok(BalanceReport {
                    balances: vec![TokenBalance {
                        symbol: "SOL".to_string(),
                        balance: native_to_ui(Decimal::from(lamports), NATIVE_DECIMALS)?,
                        decimals: NATIVE_DECIMALS,
                        address: WSOL_MINT.to_string(),
                    }],
                    degraded: true,
                }),
                Err(err) => {
                    warn!(target: "balances", "native balance unavailable: {err}");
                    Err(SdkError::NoBalance)
                }
            }
        }
    }
}

/// UI balance of `mint` held by `owner`, summed over all its token accounts
pub async fn token_balance(
    rpc: &dyn RpcSurface,
    owner: &Pubkey,
    mint: &Pubkey,
    default_decimals: u8,
) -> SdkResult<(Decimal, u8)> {
    let accounts = rpc
        .token_accounts(*owner, TokenAccountQuery::Mint(*mint))
        .await?;
    let total = accounts
        .iter()
        .fold(0_u64, |total, a| total.saturating_add(a.amount));
    let decimals = accounts
        .iter()
        .map(|a| a.decimals)
        .find(|d| *d > 0)
        .unwrap_or(default_decimals);

    Ok((native_to_ui(Decimal::from(total), decimals)?, decimals))
}

async fn tracked_balances(
    rpc: &dyn RpcSurface,
    owner: &Pubkey,
    tokens: &[TrackedToken],
) -> SdkResult<Vec<TokenBalance>> {
    let mut balances = Vec::with_capacity(tokens.len());
    for token in tokens {
        let (balance, decimals) = token_balance(rpc, owner, &token.mint, token.decimals).await?;
        debug!(target: "balances", "{}: {balance}", token.symbol);
        balances.push(TokenBalance {
            symbol: token.symbol.clone(),
            balance,
            decimals,
            address: token.mint.to_string(),
        });
    }
    Ok(balances)
}

/// Log every token account of `owner`, never fails
async fn scan_token_accounts(rpc: &dyn RpcSurface, owner: &Pubkey) {
    match rpc
        .token_accounts(*owner, TokenAccountQuery::ProgramId(anchor_spl::token::ID))
        .await
    {
        Ok(accounts) => {
            info!(
                target: "balances",
                "all tracked balances are zero, wallet has {} token accounts",
                accounts.len()
            );
            for account in accounts.iter().filter(|a| a.amount > 0) {
                info!(
                    target: "balances",
                    "{} holds {} of mint {}", account.address, account.amount, account.mint
                );
            }
        }
        Err(err) => warn!(target: "balances", "token account scan failed: {err}"),
    }
}
