use anchor_lang::Discriminator;

use crate::*;

pub const MAX_ORDERTREE_NODES: usize = 1024;

/// Byte size of every order tree node
pub const NODE_SIZE: usize = 88;

#[account(zero_copy)]
pub struct BookSide {
    /// [fixed, oracle pegged]
    pub roots: [OrderTreeRoot; 2],
    pub reserved_roots: [OrderTreeRoot; 4],
    pub reserved: [u8; 256],
    pub nodes: OrderTreeNodes,
}

#[zero_copy]
pub struct AnyNode {
    pub tag: u8,
    pub data: [u8; 79],
    // essential to make AnyNode alignment the same as other node types
    pub force_align: u64,
}

#[zero_copy]
pub struct OrderTreeNodes {
    pub order_tree_type: u8, // OrderTreeType, but that's not POD
    pub padding: [u8; 3],
    pub bump_index: u32,
    pub free_list_len: u32,
    pub free_list_head: NodeHandle,
    pub reserved: [u8; 512],
    pub nodes: [AnyNode; MAX_ORDERTREE_NODES],
}

pub type NodeHandle = u32;

#[zero_copy]
#[derive(Debug)]
pub struct OrderTreeRoot {
    pub maybe_node: NodeHandle,
    pub leaf_count: u32,
}

/// An order resting in the book, decoded from a leaf node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingOrder {
    /// The binary tree key: price data in the high 64 bits, sequence number below
    pub key: u128,
    /// Address of the owning open orders account
    pub owner: Pubkey,
    /// Number of base lots, always >= 1
    pub quantity: i64,
    pub timestamp: u64,
    /// Seconds after `timestamp` at which the order expires, 0 = never
    pub time_in_force: u16,
    pub client_order_id: u64,
}

impl RestingOrder {
    /// Price in lots for orders of the fixed order tree
    pub fn price_lots(&self) -> i64 {
        (self.key >> 64) as i64
    }

    /// Returns if the order is expired at `now_ts`
    pub fn is_expired(&self, now_ts: u64) -> bool {
        self.time_in_force > 0 && now_ts >= self.timestamp.saturating_add(self.time_in_force as u64)
    }
}

// Leaf and inner nodes share AnyNode's 88 byte footprint. Fields are read from
// the raw bytes since the u128 key would not keep AnyNode's alignment on host targets.
fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0_u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn read_u128(bytes: &[u8], offset: usize) -> u128 {
    let mut buf = [0_u8; 16];
    buf.copy_from_slice(&bytes[offset..offset + 16]);
    u128::from_le_bytes(buf)
}

impl AnyNode {
    fn bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Child handles of an inner node, `[left, right]`
    fn children(&self) -> [NodeHandle; 2] {
        let bytes = self.bytes();
        [read_u32(bytes, 24), read_u32(bytes, 28)]
    }

    /// Decode a leaf node, `None` for any other node kind
    pub fn as_leaf(&self) -> Option<RestingOrder> {
        if self.tag != LEAF_NODE_TAG {
            return None;
        }
        let bytes = self.bytes();
        let mut owner = [0_u8; 32];
        owner.copy_from_slice(&bytes[24..56]);
        Some(RestingOrder {
            time_in_force: read_u16(bytes, 2),
            key: read_u128(bytes, 8),
            owner: Pubkey::new_from_array(owner),
            quantity: read_u64(bytes, 56) as i64,
            timestamp: read_u64(bytes, 64),
            client_order_id: read_u64(bytes, 80),
        })
    }
}

impl BookSide {
    /// Decode raw account data into a heap allocated, aligned copy
    ///
    /// `None` on a foreign discriminator or short data
    pub fn from_account_data(data: &[u8]) -> Option<Box<Self>> {
        if data.len() < 8 || data[..8] != Self::discriminator() {
            return None;
        }
        let body = data[8..].get(..std::mem::size_of::<Self>())?;
        let mut book: Box<Self> = bytemuck::allocation::zeroed_box();
        bytemuck::bytes_of_mut(book.as_mut()).copy_from_slice(body);
        Some(book)
    }

    fn node(&self, handle: NodeHandle) -> Option<&AnyNode> {
        self.nodes.nodes.get(handle as usize)
    }

    /// Fixed price orders of this side, best price first
    ///
    /// Bids are visited by descending key, asks by ascending key
    pub fn fixed_orders(&self, side: Side) -> FixedOrders<'_> {
        let root = self.roots[0];
        let stack = if root.leaf_count == 0 {
            vec![]
        } else {
            vec![root.maybe_node]
        };
        FixedOrders {
            book: self,
            stack,
            // inner node children are [lower keys, higher keys]
            first_child: match side {
                Side::Bid => 1,
                Side::Ask => 0,
            },
            remaining: MAX_ORDERTREE_NODES,
        }
    }

    /// Best fixed price order of `side` that is not expired at `now_ts`
    pub fn best_valid(&self, side: Side, now_ts: u64) -> Option<RestingOrder> {
        self.fixed_orders(side).find(|order| !order.is_expired(now_ts))
    }
}

/// In order walk over the leaves of a fixed order tree
pub struct FixedOrders<'a> {
    book: &'a BookSide,
    stack: Vec<NodeHandle>,
    first_child: usize,
    /// a well formed tree visits each node once, corrupt data stops here
    remaining: usize,
}

impl Iterator for FixedOrders<'_> {
    type Item = RestingOrder;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(handle) = self.stack.pop() {
            if self.remaining == 0 {
                self.stack.clear();
                return None;
            }
            self.remaining -= 1;
            let Some(node) = self.book.node(handle) else {
                self.stack.clear();
                return None;
            };
            match node.tag {
                INNER_NODE_TAG => {
                    let children = node.children();
                    self.stack.push(children[1 - self.first_child]);
                    self.stack.push(children[self.first_child]);
                }
                LEAF_NODE_TAG => return node.as_leaf(),
                _ => {
                    self.stack.clear();
                    return None;
                }
            }
        }
        None
    }
}
