//! OpenBook v2 trading SDK
//!
//! Places orders on and reads balances for a single OpenBook v2 market.
//!
//! ```ignore
//! use openbook_trade_sdk::{types::{Context, OrderRequest}, ClientConfig, TradeClient, Wallet};
//! use rust_decimal_macros::dec;
//!
//! let wallet = Wallet::try_from_str("~/.config/solana/id.json")?;
//! let client = TradeClient::new(ClientConfig::new(Context::MainNet), wallet)?;
//!
//! let balances = client.balances().await?;
//! let outcome = client.place_order(OrderRequest::buy(dec!(0.5), dec!(150))).await;
//! println!("{}", outcome.message());
//! ```

use std::sync::Arc;

use anchor_lang::{AccountDeserialize, InstructionData, ToAccountMetas};
use log::{debug, info, warn};
use openbook_v2_light::{pda, BookSide, Market, OpenOrdersAccount, OpenOrdersIndexer};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, Message, VersionedMessage},
    signature::Signature,
    system_program,
};
pub use solana_sdk::pubkey::Pubkey;

pub mod balances;
pub mod config;
pub mod connection;
pub mod constants;
pub mod math;
pub mod rate_limiter;
pub mod types;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod test_utils;

pub use config::ClientConfig;
use connection::{Connection, ConnectionSelector, Connector, HttpConnector};
use math::{build_place_order_args, ClientOrderIds, MarketDescriptor, OrderSettings};
use rate_limiter::RateLimiter;
use types::*;
pub use wallet::{CallbackSigner, TransactionSigner, Wallet};

/// Client for one OpenBook v2 market and one wallet
///
/// It is cheaply clone-able and consumers are encouraged to do so.
/// Clones share the rate limiter and endpoint state.
#[derive(Clone)]
#[must_use]
pub struct TradeClient {
    inner: Arc<TradeClientInner>,
}

struct TradeClientInner {
    config: ClientConfig,
    market: Pubkey,
    limiter: RateLimiter,
    selector: ConnectionSelector,
    signer: Arc<dyn TransactionSigner>,
    order_ids: ClientOrderIds,
}

impl TradeClient {
    /// Create a client talking http(s) to the configured endpoints
    pub fn new(config: ClientConfig, signer: impl TransactionSigner + 'static) -> SdkResult<Self> {
        let connector = HttpConnector::new(
            config.request_timeout,
            CommitmentConfig {
                commitment: config.commitment,
            },
        );
        Self::with_connector(config, Arc::new(signer), &connector)
    }

    /// Create a client whose endpoints are built by `connector`
    pub fn with_connector(
        config: ClientConfig,
        signer: Arc<dyn TransactionSigner>,
        connector: &dyn Connector,
    ) -> SdkResult<Self> {
        config.validate()?;
        let market = config
            .market
            .ok_or_else(|| SdkError::InvalidConfig("no market".into()))?;
        let selector = ConnectionSelector::new(
            config.endpoints.as_slice(),
            connector,
            config.probe_timeout,
            config.selection_policy,
        )?;

        Ok(Self {
            inner: Arc::new(TradeClientInner {
                limiter: RateLimiter::new(config.throttle_interval),
                market,
                selector,
                signer,
                order_ids: ClientOrderIds::default(),
                config,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The wallet address: fee payer and owner of all accounts
    pub fn owner(&self) -> Pubkey {
        self.inner.signer.pubkey()
    }

    /// The market this client trades on
    pub fn market(&self) -> &Pubkey {
        &self.inner.market
    }

    /// Wait for the rate limiter then pick a live endpoint
    async fn connect(&self) -> SdkResult<Connection> {
        self.inner.limiter.throttle().await;
        self.inner.selector.select().await
    }

    /// Fetch and decode the market account
    async fn load_market(&self, connection: &Connection) -> SdkResult<MarketDescriptor> {
        let address = self.inner.market;
        let account = connection
            .rpc
            .fetch_account(address)
            .await?
            .ok_or(SdkError::MarketNotFound(address))?;
        if account.owner != constants::PROGRAM_ID {
            warn!(target: "client", "market {address} is owned by {}", account.owner);
            return Err(SdkError::MarketNotFound(address));
        }
        let market =
            Market::from_account_data(&account.data).ok_or(SdkError::MarketNotFound(address))?;
        MarketDescriptor::from_market(address, &market)
    }

    fn symbol_of(&self, mint: &Pubkey) -> String {
        self.inner
            .config
            .tracked_tokens
            .iter()
            .find(|t| t.mint == *mint)
            .map(|t| t.symbol.clone())
            .or_else(|| constants::known_symbol(self.inner.config.context, mint))
            .unwrap_or_else(|| utils::abbreviate(&mint.to_string()))
    }

    /// Return display metadata of the market
    pub async fn market_info(&self) -> SdkResult<MarketInfo> {
        let connection = self.connect().await?;
        let market = self.load_market(&connection).await?;

        Ok(MarketInfo {
            market_address: market.address.to_string(),
            base_mint: market.base_mint.to_string(),
            quote_mint: market.quote_mint.to_string(),
            base_symbol: self.symbol_of(&market.base_mint),
            quote_symbol: self.symbol_of(&market.quote_mint),
            program_id: market.program_id.to_string(),
        })
    }

    /// Return the best fixed price bid and ask resting on the book, expired orders skipped
    pub async fn top_of_book(&self) -> SdkResult<TopOfBook> {
        let connection = self.connect().await?;
        let market = self.load_market(&connection).await?;
        let accounts = connection
            .rpc
            .fetch_accounts(vec![market.bids, market.asks])
            .await?;

        let level = |account: Option<&solana_sdk::account::Account>,
                     side: Side|
         -> SdkResult<Option<BookLevel>> {
            let account = account.ok_or(SdkError::InvalidAccount)?;
            let book = BookSide::from_account_data(&account.data).ok_or(SdkError::InvalidAccount)?;
            book.best_valid(side, math::unix_secs())
                .map(|order| -> SdkResult<BookLevel> {
                    Ok(BookLevel {
                        price_lots: order.price_lots(),
                        size_lots: order.quantity,
                        price: market.price_from_lots(order.price_lots())?,
                        size: market.quantity_from_lots(order.quantity)?,
                    })
                })
                .transpose()
        };

        Ok(TopOfBook {
            best_bid: level(accounts.first().and_then(Option::as_ref), Side::Bid)?,
            best_ask: level(accounts.get(1).and_then(Option::as_ref), Side::Ask)?,
        })
    }

    /// Return the wallet balances of the tracked tokens
    ///
    /// Degrades to the native balance when token accounts cannot be read, fails
    /// with `NoBalance` only if nothing could be read at all
    pub async fn balances(&self) -> SdkResult<BalanceReport> {
        let connection = match self.connect().await {
            Ok(connection) => connection,
            Err(err) => {
                warn!(target: "client", "no endpoint for balance read: {err}");
                return Err(SdkError::NoBalance);
            }
        };
        balances::read_balances(
            connection.rpc.as_ref(),
            &self.owner(),
            &self.inner.config.tracked_tokens,
        )
        .await
    }

    /// Build, sign and broadcast a `place_order` transaction for `request`
    ///
    /// Returns the tx signature on success
    pub async fn submit_order(&self, request: OrderRequest) -> SdkResult<Signature> {
        let mut stage = SubmissionStage::Idle;
        self.submit(&request, &mut stage).await
    }

    /// Like `submit_order` but never fails, for UI callers
    pub async fn place_order(&self, request: OrderRequest) -> OrderOutcome {
        let mut stage = SubmissionStage::Idle;
        match self.submit(&request, &mut stage).await {
            Ok(signature) => OrderOutcome::Submitted {
                signature: signature.to_string(),
            },
            Err(err) => {
                warn!(target: "client", "order failed after stage '{stage}': {err}");
                OrderOutcome::Failed {
                    stage,
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn submit(
        &self,
        request: &OrderRequest,
        stage: &mut SubmissionStage,
    ) -> SdkResult<Signature> {
        let config = &self.inner.config;
        let owner = self.owner();

        advance(stage, SubmissionStage::Throttling);
        let connection = self.connect().await?;
        advance(stage, SubmissionStage::ConnectionAcquired);

        let market = self.load_market(&connection).await?;
        if market.is_expired(math::unix_secs() as i64) {
            return Err(SdkError::MarketExpired);
        }
        advance(stage, SubmissionStage::MarketLoaded);

        if config.balance_precheck {
            self.check_balance(&connection, &market, request).await?;
        }
        let now_ts = math::unix_secs();
        let settings = OrderSettings {
            safety_margin: config.safety_margin,
            match_limit: config.match_limit,
            self_trade_behavior: config.self_trade_behavior,
            order_type: config.order_type,
            client_order_id: self.inner.order_ids.next_id(),
            expiry_timestamp: math::expiry_timestamp(now_ts, config.order_ttl_secs),
        };
        let args = build_place_order_args(&market, request, &settings)?;
        debug!(target: "client", "order args: {args:?}");
        advance(stage, SubmissionStage::ParametersComputed);

        let (open_orders_account, setup_ixs) =
            self.open_orders_setup(&connection, &market).await?;
        let place_ix = place_order_ix(&owner, open_orders_account, &market, args);

        let mut builder = TransactionBuilder::new(owner).add_ixs(setup_ixs);
        if let Some(priority_fee) = config.priority_fee {
            builder = builder.priority_fee(priority_fee);
        }
        if config.legacy_transactions {
            builder = builder.legacy();
        }
        let recent_blockhash = connection.rpc.latest_blockhash().await?;
        let message = builder.add_ix(place_ix).build(recent_blockhash)?;

        let unsigned = wallet::unsigned_tx(message);
        let signed = self
            .inner
            .signer
            .sign_transaction(unsigned.clone())
            .await?;
        wallet::verify_signed(&unsigned, &signed, &owner)?;
        advance(stage, SubmissionStage::Signed);

        if config.simulate {
            connection.rpc.simulate(signed.clone()).await?;
        }
        let signature = connection.rpc.broadcast(signed).await?;
        advance(stage, SubmissionStage::Broadcast);
        info!(
            target: "client",
            "order {} sent via {}: {signature}", args.client_order_id, connection.endpoint
        );

        Ok(signature)
    }

    /// Fail with `InsufficientBalance` if the wallet cannot pay for `request`
    async fn check_balance(
        &self,
        connection: &Connection,
        market: &MarketDescriptor,
        request: &OrderRequest,
    ) -> SdkResult<()> {
        let side: Side = request.side.into();
        let mint = market.paying_mint(side);
        let (required, decimals) = match side {
            Side::Bid => (request.notional(), market.quote_decimals),
            Side::Ask => (Some(request.quantity), market.base_decimals),
        };
        let required = required
            .ok_or_else(|| SdkError::InvalidOrderParams("order value out of range".into()))?;
        let (available, _) =
            balances::token_balance(connection.rpc.as_ref(), &self.owner(), &mint, decimals)
                .await?;

        if available < required {
            return Err(SdkError::InsufficientBalance {
                symbol: self.symbol_of(&mint),
                required,
                available,
            });
        }
        Ok(())
    }

    /// Find the owner's open orders account for `market`, returning the
    /// instructions creating it (and the indexer) when there is none
    async fn open_orders_setup(
        &self,
        connection: &Connection,
        market: &MarketDescriptor,
    ) -> SdkResult<(Pubkey, Vec<Instruction>)> {
        let owner = self.owner();
        let indexer_address = pda::open_orders_indexer(&owner);
        let name = &self.inner.config.open_orders_name;

        let indexer = match connection.rpc.fetch_account(indexer_address).await? {
            Some(account) => OpenOrdersIndexer::try_deserialize(&mut account.data.as_ref())
                .map_err(|_| SdkError::InvalidAccount)?,
            None => {
                debug!(target: "client", "creating open orders indexer for {owner}");
                let account = pda::open_orders_account(&owner, 1);
                return Ok((
                    account,
                    vec![
                        create_indexer_ix(&owner, indexer_address),
                        create_open_orders_account_ix(
                            &owner,
                            indexer_address,
                            account,
                            market.address,
                            name,
                        ),
                    ],
                ));
            }
        };

        for addresses in indexer.addresses.chunks(constants::MAX_MULTIPLE_ACCOUNTS) {
            let accounts = connection.rpc.fetch_accounts(addresses.to_vec()).await?;
            for (address, account) in addresses.iter().zip(accounts) {
                let Some(account) = account else { continue };
                match OpenOrdersAccount::try_deserialize(&mut account.data.as_ref()) {
                    Ok(ooa) if ooa.market == market.address && ooa.owner == owner => {
                        return Ok((*address, vec![]));
                    }
                    Ok(_) => (),
                    Err(_) => warn!(target: "client", "undecodable open orders account {address}"),
                }
            }
        }

        let account = pda::open_orders_account(&owner, indexer.next_account_num());
        debug!(target: "client", "creating open orders account {account}");
        Ok((
            account,
            vec![create_open_orders_account_ix(
                &owner,
                indexer_address,
                account,
                market.address,
                name,
            )],
        ))
    }
}

fn advance(stage: &mut SubmissionStage, next: SubmissionStage) {
    debug!(target: "client", "submission stage: {stage} -> {next}");
    *stage = next;
}

fn create_indexer_ix(owner: &Pubkey, indexer: Pubkey) -> Instruction {
    let accounts = openbook_v2_light::accounts::CreateOpenOrdersIndexer {
        payer: *owner,
        owner: *owner,
        open_orders_indexer: indexer,
        system_program: system_program::ID,
    };
    Instruction {
        program_id: constants::PROGRAM_ID,
        accounts: accounts.to_account_metas(None),
        data: openbook_v2_light::instruction::CreateOpenOrdersIndexer {}.data(),
    }
}

fn create_open_orders_account_ix(
    owner: &Pubkey,
    indexer: Pubkey,
    open_orders_account: Pubkey,
    market: Pubkey,
    name: &str,
) -> Instruction {
    let accounts = openbook_v2_light::accounts::CreateOpenOrdersAccount {
        payer: *owner,
        owner: *owner,
        delegate_account: None,
        open_orders_indexer: indexer,
        open_orders_account,
        market,
        system_program: system_program::ID,
    };
    Instruction {
        program_id: constants::PROGRAM_ID,
        accounts: accounts.to_account_metas(None),
        data: openbook_v2_light::instruction::CreateOpenOrdersAccount {
            name: name.to_string(),
        }
        .data(),
    }
}

fn place_order_ix(
    owner: &Pubkey,
    open_orders_account: Pubkey,
    market: &MarketDescriptor,
    args: PlaceOrderArgs,
) -> Instruction {
    let paying_mint = market.paying_mint(args.side);
    let accounts = openbook_v2_light::accounts::PlaceOrder {
        signer: *owner,
        open_orders_account,
        open_orders_admin: market.open_orders_admin,
        user_token_account: anchor_spl::associated_token::get_associated_token_address(
            owner,
            &paying_mint,
        ),
        market: market.address,
        bids: market.bids,
        asks: market.asks,
        event_heap: market.event_heap,
        market_vault: market.vault_for(args.side),
        oracle_a: market.oracle_a,
        oracle_b: market.oracle_b,
        token_program: anchor_spl::token::ID,
    };
    Instruction {
        program_id: market.program_id,
        accounts: accounts.to_account_metas(None),
        data: openbook_v2_light::instruction::PlaceOrder::from(args).data(),
    }
}

/// Composable tx builder
///
/// ```ignore
/// let message = TransactionBuilder::new(wallet.signer())
///     .priority_fee(5)
///     .add_ix(ix)
///     .legacy()
///     .build(recent_blockhash)?;
/// ```
pub struct TransactionBuilder {
    /// the account to pay for the tx
    payer: Pubkey,
    /// ordered list of instructions
    ixs: Vec<Instruction>,
    /// use legacy transaction mode
    legacy: bool,
}

impl TransactionBuilder {
    /// Initialize a new `TransactionBuilder` paid by `payer`
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            ixs: Default::default(),
            legacy: false,
        }
    }
    /// Use legacy tx mode
    pub fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }
    /// Set the priority fee of the tx
    ///
    /// `priority_fee` the price per unit of compute in µ-lamports
    pub fn priority_fee(mut self, priority_fee: u64) -> Self {
        let ix = ComputeBudgetInstruction::set_compute_unit_price(priority_fee);
        self.ixs.insert(0, ix);
        self
    }
    pub fn add_ix(mut self, ix: Instruction) -> Self {
        self.ixs.push(ix);
        self
    }
    pub fn add_ixs(mut self, ixs: impl IntoIterator<Item = Instruction>) -> Self {
        self.ixs.extend(ixs);
        self
    }

    /// Build the transaction message ready for signing and sending
    pub fn build(self, recent_blockhash: Hash) -> SdkResult<VersionedMessage> {
        if self.legacy {
            let message =
                Message::new_with_blockhash(self.ixs.as_ref(), Some(&self.payer), &recent_blockhash);
            Ok(VersionedMessage::Legacy(message))
        } else {
            let message =
                v0::Message::try_compile(&self.payer, self.ixs.as_slice(), &[], recent_blockhash)?;
            Ok(VersionedMessage::V0(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::Discriminator;
    use rust_decimal_macros::dec;
    use solana_sdk::{signature::Keypair, signer::Signer, transaction::VersionedTransaction};

    use super::*;
    use crate::{
        connection::ParsedTokenAccount,
        test_utils::{
            book_side_with, indexer_account, open_orders_account, StubConnector, StubMarket,
            StubOrder, StubRpc,
        },
    };

    struct Setup {
        client: TradeClient,
        connector: StubConnector,
        market: StubMarket,
        wallet: Wallet,
    }

    impl Setup {
        fn rpc(&self) -> &StubRpc {
            self.connector.rpc(0)
        }
    }

    fn setup_with_signer(signer: Option<Arc<dyn TransactionSigner>>) -> Setup {
        let wallet = Wallet::new(Keypair::new());
        let market = StubMarket::sol_usdc();
        let rpc = StubRpc::default();
        market.install(&rpc);
        rpc.add_token_account(ParsedTokenAccount {
            address: Pubkey::new_unique(),
            mint: market.quote_mint,
            amount: 1_000_000_000,
            decimals: 6,
        });
        let connector = StubConnector::new(vec![rpc]);
        let config = ClientConfig::new(Context::MainNet)
            .with_endpoints(&["stub"])
            .with_market(market.address)
            .with_throttle_interval(std::time::Duration::ZERO);
        let signer = signer.unwrap_or_else(|| Arc::new(wallet.clone()));
        let client = TradeClient::with_connector(config, signer, &connector).unwrap();

        Setup {
            client,
            connector,
            market,
            wallet,
        }
    }

    fn setup() -> Setup {
        setup_with_signer(None)
    }

    fn instruction_names(tx: &VersionedTransaction) -> Vec<[u8; 8]> {
        tx.message
            .instructions()
            .iter()
            .filter_map(|ix| ix.data.get(..8).and_then(|d| d.try_into().ok()))
            .collect()
    }

    #[tokio::test]
    async fn market_info_uses_token_symbols() {
        let setup = setup();
        let info = setup.client.market_info().await.unwrap();

        assert_eq!(info.market_address, setup.market.address.to_string());
        assert_eq!(info.base_symbol, "SOL");
        assert_eq!(info.quote_symbol, "USDC");
        assert_eq!(info.program_id, constants::PROGRAM_ID.to_string());
    }

    #[tokio::test]
    async fn missing_market_is_market_not_found() {
        let setup = setup();
        let outcome = TradeClient::with_connector(
            setup.client.config().clone().with_market(Pubkey::new_unique()),
            Arc::new(setup.wallet.clone()),
            &StubConnector::new(vec![StubRpc::default()]),
        )
        .unwrap()
        .place_order(OrderRequest::buy(dec!(1), dec!(150)))
        .await;

        match outcome {
            OrderOutcome::Failed { stage, kind, .. } => {
                assert_eq!(stage, SubmissionStage::ConnectionAcquired);
                assert_eq!(kind, ErrorKind::Domain);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_order_creates_open_orders_accounts() {
        let setup = setup();
        let signature = setup
            .client
            .submit_order(OrderRequest::buy(dec!(2.5), dec!(150.25)))
            .await
            .expect("submitted");

        let broadcasts = setup.rpc().broadcasts();
        assert_eq!(broadcasts.len(), 1);
        let tx = &broadcasts[0];
        assert_eq!(tx.signatures[0], signature);
        assert_eq!(
            tx.message.static_account_keys()[0],
            setup.wallet.pubkey(),
            "wallet pays fees"
        );
        assert_eq!(
            instruction_names(tx),
            vec![
                openbook_v2_light::instruction::CreateOpenOrdersIndexer::discriminator(),
                openbook_v2_light::instruction::CreateOpenOrdersAccount::discriminator(),
                openbook_v2_light::instruction::PlaceOrder::discriminator(),
            ]
        );
        assert!(tx
            .message
            .static_account_keys()
            .contains(&pda::open_orders_account(&setup.wallet.pubkey(), 1)));
    }

    #[tokio::test]
    async fn existing_open_orders_account_is_reused() {
        let setup = setup();
        let owner = setup.wallet.pubkey();
        let existing = pda::open_orders_account(&owner, 3);
        setup.rpc().set_account(
            pda::open_orders_indexer(&owner),
            indexer_account(&OpenOrdersIndexer {
                bump: 255,
                created_counter: 3,
                addresses: vec![existing],
            }),
        );
        setup.rpc().set_account(
            existing,
            open_orders_account(owner, setup.market.address, 3),
        );

        setup
            .client
            .submit_order(OrderRequest::sell(dec!(0), dec!(150)))
            .await
            .expect_err("zero quantity is rejected");
        assert_eq!(setup.rpc().calls.broadcast(), 0);

        setup.rpc().add_token_account(ParsedTokenAccount {
            address: Pubkey::new_unique(),
            mint: setup.market.base_mint,
            amount: 5_000_000_000,
            decimals: 9,
        });
        setup
            .client
            .submit_order(OrderRequest::sell(dec!(1), dec!(150)))
            .await
            .expect("submitted");

        let tx = &setup.rpc().broadcasts()[0];
        assert_eq!(
            instruction_names(tx),
            vec![openbook_v2_light::instruction::PlaceOrder::discriminator()]
        );
        assert!(tx.message.static_account_keys().contains(&existing));
    }

    #[tokio::test]
    async fn new_account_number_follows_indexer_counter() {
        let setup = setup();
        let owner = setup.wallet.pubkey();
        setup.rpc().set_account(
            pda::open_orders_indexer(&owner),
            indexer_account(&OpenOrdersIndexer {
                bump: 255,
                created_counter: 1,
                // account on another market, not in the stub
                addresses: vec![pda::open_orders_account(&owner, 1)],
            }),
        );

        setup
            .client
            .submit_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await
            .expect("submitted");

        let tx = &setup.rpc().broadcasts()[0];
        assert_eq!(
            instruction_names(tx),
            vec![
                openbook_v2_light::instruction::CreateOpenOrdersAccount::discriminator(),
                openbook_v2_light::instruction::PlaceOrder::discriminator(),
            ]
        );
        assert!(tx
            .message
            .static_account_keys()
            .contains(&pda::open_orders_account(&owner, 2)));
    }

    #[tokio::test]
    async fn insufficient_balance_stops_before_parameters() {
        let setup = setup();
        // 1000 USDC held, order needs 15_000
        let outcome = setup
            .client
            .place_order(OrderRequest::buy(dec!(100), dec!(150)))
            .await;

        assert_eq!(
            outcome,
            OrderOutcome::Failed {
                stage: SubmissionStage::MarketLoaded,
                kind: ErrorKind::Domain,
                message: "insufficient USDC balance: required 15000, available 1000".into(),
            }
        );
        assert_eq!(setup.rpc().calls.broadcast(), 0);
        assert_eq!(setup.rpc().calls.latest_blockhash(), 0);
    }

    /// Client over a fresh stub holding only the market, no balance pre-check
    fn bare_client(
        setup: &Setup,
        config: ClientConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> (TradeClient, StubConnector) {
        let rpc = StubRpc::default();
        setup.market.install(&rpc);
        let connector = StubConnector::new(vec![rpc]);
        let client =
            TradeClient::with_connector(config.with_balance_precheck(false), signer, &connector)
                .unwrap();
        (client, connector)
    }

    #[tokio::test]
    async fn signer_rejection_is_not_broadcast() {
        let setup = setup();
        let rejecting = CallbackSigner::new(Pubkey::new_unique(), |_tx| async {
            Err(solana_sdk::signer::SignerError::UserCancel("rejected".into()).into())
        });
        let (client, connector) =
            bare_client(&setup, setup.client.config().clone(), Arc::new(rejecting));

        let outcome = client
            .place_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await;

        match outcome {
            OrderOutcome::Failed { stage, kind, .. } => {
                assert_eq!(stage, SubmissionStage::ParametersComputed);
                assert_eq!(kind, ErrorKind::Signing);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(connector.rpc(0).calls.broadcast(), 0);
    }

    #[tokio::test]
    async fn failed_simulation_is_not_broadcast() {
        let setup = setup();
        let (client, connector) = bare_client(
            &setup,
            setup.client.config().clone().with_simulation(true),
            Arc::new(setup.wallet.clone()),
        );
        connector.rpc(0).fail_simulate(true);

        let outcome = client
            .place_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await;

        match outcome {
            OrderOutcome::Failed { stage, message, .. } => {
                assert_eq!(stage, SubmissionStage::Signed);
                assert!(message.contains("simulation failed"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(connector.rpc(0).calls.simulate(), 1);
        assert_eq!(connector.rpc(0).calls.broadcast(), 0);

        // simulation is off by default
        setup
            .client
            .submit_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await
            .unwrap();
        assert_eq!(setup.rpc().calls.simulate(), 0);
    }

    #[tokio::test]
    async fn all_endpoints_down_fails_at_throttling() {
        let setup = setup();
        setup.rpc().set_down(true);
        let outcome = setup
            .client
            .place_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await;

        assert!(matches!(
            outcome,
            OrderOutcome::Failed {
                stage: SubmissionStage::Throttling,
                kind: ErrorKind::Transport,
                ..
            }
        ));
        assert!(matches!(
            setup.client.balances().await,
            Err(SdkError::NoBalance)
        ));
    }

    #[tokio::test]
    async fn top_of_book_of_empty_book() {
        let setup = setup();
        let info = setup.client.top_of_book().await.unwrap();
        assert_eq!(info, TopOfBook::default());
    }

    #[tokio::test]
    async fn top_of_book_skips_expired_orders() {
        let setup = setup();
        setup.rpc().set_account(
            setup.market.bids,
            book_side_with(&[
                StubOrder::live(149_000, 2_000),
                StubOrder::expired(150_000, 1_000),
                StubOrder::live(148_500, 10),
            ]),
        );
        setup.rpc().set_account(
            setup.market.asks,
            book_side_with(&[
                StubOrder::expired(150_500, 1),
                StubOrder::live(152_000, 3_000),
                StubOrder::live(151_000, 500),
            ]),
        );

        let book = setup.client.top_of_book().await.unwrap();

        let bid = book.best_bid.expect("live bid");
        assert_eq!(bid.price_lots, 149_000);
        assert_eq!(bid.size_lots, 2_000);
        assert_eq!(bid.price, dec!(149));
        assert_eq!(bid.size, dec!(2));
        let ask = book.best_ask.expect("live ask");
        assert_eq!(ask.price_lots, 151_000);
        assert_eq!(ask.price, dec!(151));
        assert_eq!(ask.size, dec!(0.5));
        assert_eq!(book.spread(), Some(dec!(2)));
    }

    #[tokio::test]
    async fn fully_expired_side_is_empty() {
        let setup = setup();
        setup.rpc().set_account(
            setup.market.asks,
            book_side_with(&[StubOrder::expired(150_500, 1)]),
        );
        let book = setup.client.top_of_book().await.unwrap();
        assert_eq!(book.best_ask, None);
    }

    #[tokio::test]
    async fn large_indexers_are_read_in_batches() {
        let setup = setup();
        let owner = setup.wallet.pubkey();
        let addresses: Vec<Pubkey> = (1..=150)
            .map(|num| pda::open_orders_account(&owner, num))
            .collect();
        let existing = addresses[129];
        setup.rpc().set_account(
            pda::open_orders_indexer(&owner),
            indexer_account(&OpenOrdersIndexer {
                bump: 255,
                created_counter: 150,
                addresses,
            }),
        );
        setup.rpc().set_account(
            existing,
            open_orders_account(owner, setup.market.address, 130),
        );

        setup
            .client
            .submit_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await
            .expect("submitted");

        assert_eq!(setup.rpc().largest_batch(), constants::MAX_MULTIPLE_ACCOUNTS);
        let tx = &setup.rpc().broadcasts()[0];
        assert_eq!(
            instruction_names(tx),
            vec![openbook_v2_light::instruction::PlaceOrder::discriminator()]
        );
        assert!(tx.message.static_account_keys().contains(&existing));
    }

    #[tokio::test]
    async fn legacy_transactions_when_configured() {
        let setup = setup();
        let (client, connector) = bare_client(
            &setup,
            setup
                .client
                .config()
                .clone()
                .with_legacy_transactions(true)
                .with_priority_fee(10),
            Arc::new(setup.wallet.clone()),
        );
        client
            .submit_order(OrderRequest::buy(dec!(1), dec!(150)))
            .await
            .expect("submitted");

        let tx = &connector.rpc(0).broadcasts()[0];
        assert!(matches!(tx.message, VersionedMessage::Legacy(_)));
        // compute budget + indexer + open orders account + place order
        assert_eq!(tx.message.instructions().len(), 4);
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn transaction_builder_modes() {
        let payer = Keypair::new().pubkey();
        let ix = solana_sdk::system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let blockhash = Hash::new_unique();

        let legacy = TransactionBuilder::new(payer)
            .add_ix(ix.clone())
            .priority_fee(5)
            .legacy()
            .build(blockhash)
            .unwrap();
        assert!(matches!(legacy, VersionedMessage::Legacy(_)));
        assert_eq!(legacy.instructions().len(), 2);
        assert_eq!(legacy.recent_blockhash(), &blockhash);

        let v0 = TransactionBuilder::new(payer).add_ix(ix).build(blockhash).unwrap();
        assert!(matches!(v0, VersionedMessage::V0(_)));
        assert_eq!(v0.static_account_keys()[0], payer);
    }
}
