//! Stub rpc and signer shared by unit tests

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anchor_lang::{AnchorSerialize, Discriminator};
use bytemuck::Zeroable;
use futures_util::{future::BoxFuture, FutureExt};
use openbook_v2_light::{
    AnyNode, BookSide, Market, NodeHandle, OpenOrdersAccount, OpenOrdersIndexer, OrderTreeRoot,
    INNER_NODE_TAG, LEAF_NODE_TAG, NODE_SIZE,
};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};

use crate::{
    connection::{Connector, ParsedTokenAccount, RpcSurface, TokenAccountQuery},
    types::{SdkError, SdkResult},
};

/// Number of calls made to each `RpcSurface` method
#[derive(Debug, Default)]
pub struct Calls {
    probe: AtomicUsize,
    fetch_account: AtomicUsize,
    latest_blockhash: AtomicUsize,
    simulate: AtomicUsize,
    broadcast: AtomicUsize,
    native_balance: AtomicUsize,
    token_accounts: AtomicUsize,
}

impl Calls {
    pub fn probe(&self) -> usize {
        self.probe.load(Ordering::SeqCst)
    }
    pub fn fetch_account(&self) -> usize {
        self.fetch_account.load(Ordering::SeqCst)
    }
    pub fn latest_blockhash(&self) -> usize {
        self.latest_blockhash.load(Ordering::SeqCst)
    }
    pub fn simulate(&self) -> usize {
        self.simulate.load(Ordering::SeqCst)
    }
    pub fn broadcast(&self) -> usize {
        self.broadcast.load(Ordering::SeqCst)
    }
    pub fn native_balance(&self) -> usize {
        self.native_balance.load(Ordering::SeqCst)
    }
    pub fn token_accounts(&self) -> usize {
        self.token_accounts.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

fn stub_error(what: &str) -> SdkError {
    SdkError::InvalidConfig(format!("stub {what} failure"))
}

/// In-memory `RpcSurface`
#[derive(Debug, Default)]
pub struct StubRpc {
    pub calls: Calls,
    down: AtomicBool,
    hanging: AtomicBool,
    fail_token_accounts: AtomicBool,
    fail_token_scan: AtomicBool,
    fail_native_balance: AtomicBool,
    fail_simulate: AtomicBool,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    token_accounts: Mutex<Vec<ParsedTokenAccount>>,
    native_lamports: AtomicUsize,
    largest_batch: AtomicUsize,
    broadcasts: Mutex<Vec<VersionedTransaction>>,
}

impl StubRpc {
    /// Endpoint failing every probe
    pub fn down() -> Self {
        let rpc = Self::default();
        rpc.set_down(true);
        rpc
    }
    /// Endpoint whose probe never answers
    pub fn hanging() -> Self {
        let rpc = Self::default();
        rpc.hanging.store(true, Ordering::SeqCst);
        rpc
    }
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
    pub fn fail_token_accounts(&self, fail: bool) {
        self.fail_token_accounts.store(fail, Ordering::SeqCst);
    }
    /// Fail only the broad token program scan
    pub fn fail_token_scan(&self, fail: bool) {
        self.fail_token_scan.store(fail, Ordering::SeqCst);
    }
    pub fn fail_native_balance(&self, fail: bool) {
        self.fail_native_balance.store(fail, Ordering::SeqCst);
    }
    pub fn fail_simulate(&self, fail: bool) {
        self.fail_simulate.store(fail, Ordering::SeqCst);
    }
    pub fn set_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }
    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.accounts.lock().unwrap().get(address).cloned()
    }
    pub fn add_token_account(&self, account: ParsedTokenAccount) {
        self.token_accounts.lock().unwrap().push(account);
    }
    pub fn set_native_balance(&self, lamports: usize) {
        self.native_lamports.store(lamports, Ordering::SeqCst);
    }
    /// Most accounts asked for by one `fetch_accounts` call
    pub fn largest_batch(&self) -> usize {
        self.largest_batch.load(Ordering::SeqCst)
    }
    /// Transactions broadcast so far
    pub fn broadcasts(&self) -> Vec<VersionedTransaction> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl RpcSurface for StubRpc {
    fn probe(&self) -> BoxFuture<SdkResult<u64>> {
        bump(&self.calls.probe);
        if self.hanging.load(Ordering::SeqCst) {
            return futures_util::future::pending().boxed();
        }
        let result = if self.down.load(Ordering::SeqCst) {
            Err(stub_error("probe"))
        } else {
            Ok(12_345)
        };
        async move { result }.boxed()
    }

    fn fetch_account(&self, account: Pubkey) -> BoxFuture<SdkResult<Option<Account>>> {
        bump(&self.calls.fetch_account);
        let result = Ok(self.account(&account));
        async move { result }.boxed()
    }

    fn fetch_accounts(&self, accounts: Vec<Pubkey>) -> BoxFuture<SdkResult<Vec<Option<Account>>>> {
        bump(&self.calls.fetch_account);
        self.largest_batch.fetch_max(accounts.len(), Ordering::SeqCst);
        let result = Ok(accounts.iter().map(|a| self.account(a)).collect());
        async move { result }.boxed()
    }

    fn latest_blockhash(&self) -> BoxFuture<SdkResult<Hash>> {
        bump(&self.calls.latest_blockhash);
        async move { Ok(Hash::new_from_array([3; 32])) }.boxed()
    }

    fn simulate(&self, _tx: VersionedTransaction) -> BoxFuture<SdkResult<()>> {
        bump(&self.calls.simulate);
        let result = if self.fail_simulate.load(Ordering::SeqCst) {
            Err(SdkError::SimulationFailed {
                err: "InstructionError(2, Custom(1))".into(),
                logs: vec!["Program log: insufficient funds".into()],
            })
        } else {
            Ok(())
        };
        async move { result }.boxed()
    }

    fn broadcast(&self, tx: VersionedTransaction) -> BoxFuture<SdkResult<Signature>> {
        bump(&self.calls.broadcast);
        let signature = tx.signatures.first().copied().unwrap_or_default();
        self.broadcasts.lock().unwrap().push(tx);
        async move { Ok(signature) }.boxed()
    }

    fn native_balance(&self, _owner: Pubkey) -> BoxFuture<SdkResult<u64>> {
        bump(&self.calls.native_balance);
        let result = if self.fail_native_balance.load(Ordering::SeqCst) {
            Err(stub_error("balance"))
        } else {
            Ok(self.native_lamports.load(Ordering::SeqCst) as u64)
        };
        async move { result }.boxed()
    }

    fn token_accounts(
        &self,
        _owner: Pubkey,
        query: TokenAccountQuery,
    ) -> BoxFuture<SdkResult<Vec<ParsedTokenAccount>>> {
        bump(&self.calls.token_accounts);
        let accounts = self.token_accounts.lock().unwrap().clone();
        let result = match query {
            _ if self.fail_token_accounts.load(Ordering::SeqCst) => Err(stub_error("token")),
            TokenAccountQuery::ProgramId(_) if self.fail_token_scan.load(Ordering::SeqCst) => {
                Err(stub_error("token scan"))
            }
            TokenAccountQuery::Mint(mint) => {
                Ok(accounts.into_iter().filter(|a| a.mint == mint).collect())
            }
            TokenAccountQuery::ProgramId(_) => Ok(accounts),
        };
        async move { result }.boxed()
    }
}

/// Hands out the given stubs in connection order, extra endpoints are down
#[derive(Default)]
pub struct StubConnector {
    rpcs: Vec<Arc<StubRpc>>,
    next: AtomicUsize,
}

impl StubConnector {
    pub fn new(rpcs: Vec<StubRpc>) -> Self {
        Self {
            rpcs: rpcs.into_iter().map(Arc::new).collect(),
            next: AtomicUsize::new(0),
        }
    }
    pub fn rpc(&self, idx: usize) -> &Arc<StubRpc> {
        &self.rpcs[idx]
    }
}

impl Connector for StubConnector {
    fn connect(&self, _endpoint: &str) -> Arc<dyn RpcSurface> {
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        match self.rpcs.get(idx) {
            Some(rpc) => Arc::clone(rpc) as Arc<dyn RpcSurface>,
            None => Arc::new(StubRpc::down()),
        }
    }
}

/// Addresses of the accounts making up a stub market
#[derive(Debug, Clone, Copy)]
pub struct StubMarket {
    pub address: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_heap: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
}

impl StubMarket {
    /// SOL/USDC shaped market: 9/6 decimals, 0.001 SOL base lots, 1 native quote lot
    pub fn sol_usdc() -> Self {
        Self {
            address: Pubkey::new_unique(),
            base_mint: crate::constants::WSOL_MINT,
            quote_mint: crate::constants::USDC_MINT,
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            event_heap: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
        }
    }

    pub fn market(&self) -> Market {
        let mut market = Market::zeroed();
        market.base_decimals = 9;
        market.quote_decimals = 6;
        market.base_lot_size = 1_000_000;
        market.quote_lot_size = 1;
        market.base_mint = self.base_mint;
        market.quote_mint = self.quote_mint;
        market.bids = self.bids;
        market.asks = self.asks;
        market.event_heap = self.event_heap;
        market.market_base_vault = self.base_vault;
        market.market_quote_vault = self.quote_vault;
        market.name = *b"SOL-USDC\0\0\0\0\0\0\0\0";
        market
    }

    /// Install the market and empty book sides into `rpc`
    pub fn install(&self, rpc: &StubRpc) {
        self.install_market(rpc, &self.market());
        let empty: Box<BookSide> = bytemuck::allocation::zeroed_box();
        rpc.set_account(self.bids, book_side_account(&empty));
        rpc.set_account(self.asks, book_side_account(&empty));
    }

    pub fn install_market(&self, rpc: &StubRpc, market: &Market) {
        let mut data = Market::discriminator().to_vec();
        data.extend_from_slice(bytemuck::bytes_of(market));
        rpc.set_account(self.address, program_account(data));
    }
}

pub fn program_account(data: Vec<u8>) -> Account {
    Account {
        lamports: 1_000_000,
        data,
        owner: openbook_v2_light::ID,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn book_side_account(book: &BookSide) -> Account {
    let mut data = BookSide::discriminator().to_vec();
    data.extend_from_slice(bytemuck::bytes_of(book));
    program_account(data)
}

pub fn indexer_account(indexer: &OpenOrdersIndexer) -> Account {
    let mut data = OpenOrdersIndexer::discriminator().to_vec();
    data.extend(indexer.try_to_vec().unwrap());
    program_account(data)
}

pub fn open_orders_account(owner: Pubkey, market: Pubkey, account_num: u32) -> Account {
    let ooa = OpenOrdersAccount {
        owner,
        market,
        name: [0; 32],
        delegate: Default::default(),
        account_num,
        bump: 255,
    };
    let mut data = OpenOrdersAccount::discriminator().to_vec();
    data.extend(ooa.try_to_vec().unwrap());
    program_account(data)
}

/// A fixed price order placed in a stub book
#[derive(Debug, Clone, Copy)]
pub struct StubOrder {
    pub price_lots: i64,
    pub quantity: i64,
    pub timestamp: u64,
    pub time_in_force: u16,
}

impl StubOrder {
    pub fn live(price_lots: i64, quantity: i64) -> Self {
        Self {
            price_lots,
            quantity,
            timestamp: 0,
            time_in_force: 0,
        }
    }
    /// Order that expired long ago
    pub fn expired(price_lots: i64, quantity: i64) -> Self {
        Self {
            price_lots,
            quantity,
            timestamp: 1,
            time_in_force: 1,
        }
    }
}

fn leaf_node(order: &StubOrder, seq: u64) -> AnyNode {
    let mut bytes = [0_u8; NODE_SIZE];
    bytes[0] = LEAF_NODE_TAG;
    bytes[2..4].copy_from_slice(&order.time_in_force.to_le_bytes());
    let key = ((order.price_lots as u128) << 64) | seq as u128;
    bytes[8..24].copy_from_slice(&key.to_le_bytes());
    bytes[56..64].copy_from_slice(&order.quantity.to_le_bytes());
    bytes[64..72].copy_from_slice(&order.timestamp.to_le_bytes());
    bytemuck::pod_read_unaligned(&bytes)
}

fn inner_node(left: NodeHandle, right: NodeHandle) -> AnyNode {
    let mut bytes = [0_u8; NODE_SIZE];
    bytes[0] = INNER_NODE_TAG;
    bytes[24..28].copy_from_slice(&left.to_le_bytes());
    bytes[28..32].copy_from_slice(&right.to_le_bytes());
    bytemuck::pod_read_unaligned(&bytes)
}

/// Insert `orders` (sorted by key) as a balanced subtree, returning its root
fn insert_orders(
    book: &mut BookSide,
    orders: &[(u64, StubOrder)],
    next: &mut NodeHandle,
) -> NodeHandle {
    let handle = *next;
    *next += 1;
    if let [(seq, order)] = orders {
        book.nodes.nodes[handle as usize] = leaf_node(order, *seq);
    } else {
        let (left, right) = orders.split_at(orders.len() / 2);
        let left = insert_orders(book, left, next);
        let right = insert_orders(book, right, next);
        book.nodes.nodes[handle as usize] = inner_node(left, right);
    }
    handle
}

/// Book side account holding `orders` in its fixed order tree
pub fn book_side_with(orders: &[StubOrder]) -> Account {
    let mut book: Box<BookSide> = bytemuck::allocation::zeroed_box();
    let mut keyed: Vec<(u64, StubOrder)> = orders
        .iter()
        .enumerate()
        .map(|(seq, order)| (seq as u64, *order))
        .collect();
    keyed.sort_by_key(|(seq, order)| (order.price_lots, *seq));
    if !keyed.is_empty() {
        let mut next = 0;
        let root = insert_orders(&mut book, &keyed, &mut next);
        book.roots[0] = OrderTreeRoot {
            maybe_node: root,
            leaf_count: keyed.len() as u32,
        };
    }
    book_side_account(&book)
}
