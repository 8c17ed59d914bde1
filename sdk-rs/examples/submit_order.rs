/// Place a limit order on the SOL/USDC market
///
/// Set environment variables:
///     * `PRIVATE_KEY`: wallet keypair, file path or encoded key
///     * `RPC_HTTP_URL`: RPC node http url (optional, public endpoints otherwise)
///     * `ORDER_SIDE`: `buy` or `sell`
///     * `ORDER_QUANTITY`: order size in SOL, e.g. `0.1`
///     * `ORDER_PRICE`: limit price in USDC, e.g. `150.25`
///
/// Run example with:
///     cargo run --example submit_order
///
use std::{env, str::FromStr};

use dotenv::dotenv;
use openbook_trade_sdk::{
    types::{Context, OrderRequest},
    ClientConfig, TradeClient, Wallet,
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let wallet = Wallet::try_from_str(&env::var("PRIVATE_KEY")?)?;
    let mut config = ClientConfig::new(Context::MainNet).with_simulation(true);
    if let Ok(url) = env::var("RPC_HTTP_URL") {
        config = config.with_endpoints(&[url]);
    }
    let client = TradeClient::new(config, wallet)?;

    let quantity = Decimal::from_str(&env::var("ORDER_QUANTITY")?)?;
    let price = Decimal::from_str(&env::var("ORDER_PRICE")?)?;
    let request = match env::var("ORDER_SIDE")?.as_str() {
        "buy" => OrderRequest::buy(quantity, price),
        "sell" => OrderRequest::sell(quantity, price),
        other => return Err(format!("unknown side: {other}").into()),
    };

    let outcome = client.place_order(request).await;
    println!("{}", outcome.message());
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
