/// Print the tracked token balances of a wallet and the market's top of book
///
/// Set environment variables:
///     * `PRIVATE_KEY`: wallet keypair, file path or encoded key
///     * `RPC_HTTP_URL`: RPC node http url (optional, public endpoints otherwise)
///
/// Run example with:
///     cargo run --example read_balances
///
use std::env;

use dotenv::dotenv;
use openbook_trade_sdk::{types::Context, ClientConfig, TradeClient, Wallet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let wallet = Wallet::try_from_str(&env::var("PRIVATE_KEY")?)?;
    let mut config = ClientConfig::new(Context::MainNet);
    if let Ok(url) = env::var("RPC_HTTP_URL") {
        config = config.with_endpoints(&[url]);
    }
    let client = TradeClient::new(config, wallet)?;

    let info = client.market_info().await?;
    println!(
        "market {} ({}/{})",
        info.market_address, info.base_symbol, info.quote_symbol
    );

    let report = client.balances().await?;
    if report.degraded {
        println!("token balances unavailable, showing native SOL only");
    }
    for balance in &report.balances {
        println!("{:>6}: {}", balance.symbol, balance.balance);
    }

    let book = client.top_of_book().await?;
    println!(
        "bid: {:?} ask: {:?} spread: {:?}",
        book.best_bid.map(|l| l.price),
        book.best_ask.map(|l| l.price),
        book.spread()
    );

    Ok(())
}
