/// Order tree node tags
pub const INNER_NODE_TAG: u8 = 1;
pub const LEAF_NODE_TAG: u8 = 2;

pub const OPEN_ORDERS_INDEXER_SEED: &[u8] = b"OpenOrdersIndexer";
pub const OPEN_ORDERS_ACCOUNT_SEED: &[u8] = b"OpenOrders";
