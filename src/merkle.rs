//! Merkle commitment over an ordered list of items.
//!
//! Leaves are the items' content hashes in input order and every parent is
//! `SHA-256(left || right)`. A level with an odd node count duplicates its last
//! node. A single leaf is its own root, and an empty list commits to
//! [`EMPTY_TRANSACTIONS_ROOT`].

use crate::blockchain::Sha256Hash;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Root of an empty transaction list: the hash of a fixed well-known string.
pub static EMPTY_TRANSACTIONS_ROOT: Lazy<Sha256Hash> =
    Lazy::new(|| Sha256::digest(b"empty transaction root hash").into());

/// Anything that can be committed to by a merkle tree.
pub trait MerkleContent {
    fn content_hash(&self) -> Sha256Hash;
    fn content_equals(&self, other: &Self) -> bool;
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion proof, from the leaf towards the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Sha256Hash,
    pub side: Side,
}

fn hash_pair(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Sha256Hash]) -> Vec<Sha256Hash> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [last] => hash_pair(last, last),
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Computes the merkle root of `items` in their given order.
pub fn merkle_root<T: MerkleContent>(items: &[T]) -> Sha256Hash {
    MerkleTree::new(items).root()
}

/// A fully built tree, keeping every level so proofs can be produced.
pub struct MerkleTree<'a, T: MerkleContent> {
    items: &'a [T],
    levels: Vec<Vec<Sha256Hash>>,
}

impl<'a, T: MerkleContent> MerkleTree<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        let leaves: Vec<Sha256Hash> = items.iter().map(MerkleContent::content_hash).collect();
        let mut levels = vec![leaves];

        while levels.last().map_or(0, Vec::len) > 1 {
            let parent = next_level(&levels[levels.len() - 1]);
            levels.push(parent);
        }

        MerkleTree { items, levels }
    }

    pub fn root(&self) -> Sha256Hash {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => *EMPTY_TRANSACTIONS_ROOT,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether an item equal to `item` is committed by this tree.
    pub fn contains(&self, item: &T) -> bool {
        self.items.iter().any(|leaf| leaf.content_equals(item))
    }

    /// Inclusion proof for the leaf at `index`, or `None` if out of range.
    pub fn proof(&self, index: usize) -> Option<Vec<ProofStep>> {
        if index >= self.items.len() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let step = if position % 2 == 0 {
                // Odd tail nodes are paired with themselves.
                let sibling = level.get(position + 1).unwrap_or(&level[position]);
                ProofStep {
                    sibling: *sibling,
                    side: Side::Right,
                }
            } else {
                ProofStep {
                    sibling: level[position - 1],
                    side: Side::Left,
                }
            };
            steps.push(step);
            position /= 2;
        }
        Some(steps)
    }
}

/// Checks that `leaf` is committed by `root` through `proof`.
pub fn verify_proof(leaf: &Sha256Hash, proof: &[ProofStep], root: &Sha256Hash) -> bool {
    let computed = proof.iter().fold(*leaf, |acc, step| match step.side {
        Side::Left => hash_pair(&step.sibling, &acc),
        Side::Right => hash_pair(&acc, &step.sibling),
    });
    &computed == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;
    use crate::transaction::{Amount, Transaction};

    fn transfers(count: u64) -> Vec<Transaction> {
        (0..count)
            .map(|i| {
                Transaction::new_transfer(
                    address_from_string("alice"),
                    address_from_string("bob"),
                    Amount::from(i + 1),
                    i,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_root_is_sentinel() {
        let empty: Vec<Transaction> = Vec::new();
        let expected: Sha256Hash = Sha256::digest(b"empty transaction root hash").into();
        assert_eq!(merkle_root(&empty), expected);
        assert_eq!(merkle_root(&empty), *EMPTY_TRANSACTIONS_ROOT);
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let txs = transfers(1);
        assert_eq!(merkle_root(&txs), txs[0].hash);
    }

    #[test]
    fn test_three_leaves_duplicate_last() {
        let txs = transfers(3);
        let h01 = hash_pair(&txs[0].hash, &txs[1].hash);
        let h22 = hash_pair(&txs[2].hash, &txs[2].hash);
        assert_eq!(merkle_root(&txs), hash_pair(&h01, &h22));
    }

    #[test]
    fn test_swapping_leaves_changes_root() {
        let txs = transfers(4);
        let mut swapped = txs.clone();
        swapped.swap(1, 2);
        assert_ne!(merkle_root(&txs), merkle_root(&swapped));
    }

    #[test]
    fn test_root_is_deterministic() {
        let txs = transfers(5);
        assert_eq!(merkle_root(&txs), merkle_root(&txs.clone()));
    }

    #[test]
    fn test_contains_uses_content_equality() {
        let txs = transfers(3);
        let tree = MerkleTree::new(&txs);
        assert!(tree.contains(&txs[1].clone()));

        let outsider = transfers(4).pop().unwrap();
        assert!(!tree.contains(&outsider));
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        let txs = transfers(5);
        let tree = MerkleTree::new(&txs);
        let root = tree.root();

        for (i, tx) in txs.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(&tx.hash, &proof, &root), "leaf {}", i);
        }
        assert!(tree.proof(5).is_none());

        let proof = tree.proof(0).unwrap();
        assert!(!verify_proof(&txs[1].hash, &proof, &root));
    }
}
