//! Canonical state keys, hashing and memoization tables.
//!
//! The canonical key keeps everything that is observable to the player
//! (foundation heights, tableau contents with facing, the waste top) and
//! collapses the undrawn stock and buried waste into a sorted set. With
//! single-card draws and unlimited recycling, their order only delays when
//! a card becomes playable, never whether it does.

use rustc_hash::FxHashSet;

use crate::state::GameState;

/// Default transposition table capacity.
pub const DEFAULT_TT_CAPACITY: usize = 4_000_000;

/// Largest initial allocation for a transposition table; it grows on demand.
const TT_INITIAL_ALLOCATION: usize = 1 << 16;

// Separator bytes sit outside the card id range (face-up ids go up to 0xB3).
const SECTION_SEPARATOR: u8 = 0xF0;
const COLUMN_SEPARATOR: u8 = 0xF1;
const NO_WASTE_TOP: u8 = 0xF2;
const FACE_UP_BIT: u8 = 0x80;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Canonical serialization of a state; equal keys mean equivalent states.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalKey(Vec<u8>);

impl CanonicalKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Builds the canonical key of `state`.
///
/// Layout: four foundation heights, then each tableau column as
/// `(id | face-up bit)` bytes, then the waste top id, then the sorted ids of
/// the stock and the rest of the waste.
pub fn canonical_key(state: &GameState) -> CanonicalKey {
    let mut key = Vec::with_capacity(80);

    key.extend(state.foundations.iter().map(|pile| pile.len() as u8));
    key.push(SECTION_SEPARATOR);

    for column in &state.tableau {
        key.extend(
            column
                .iter()
                .map(|c| if c.face_up { c.id() | FACE_UP_BIT } else { c.id() }),
        );
        key.push(COLUMN_SEPARATOR);
    }
    key.push(SECTION_SEPARATOR);

    let (buried, top) = match state.waste.split_last() {
        Some((top, buried)) => (buried, top.id()),
        None => (&state.waste[..], NO_WASTE_TOP),
    };
    key.push(top);
    key.push(SECTION_SEPARATOR);

    let pool_start = key.len();
    key.extend(state.stock.iter().chain(buried).map(|c| c.id()));
    key[pool_start..].sort_unstable();

    CanonicalKey(key)
}

/// 32-bit FNV-1a over raw bytes.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Hash of the canonical key of `state`.
#[inline]
pub fn hash_state(state: &GameState) -> u32 {
    fnv1a(canonical_key(state).as_bytes())
}

/// Fixed-capacity set of explored state hashes with FIFO eviction.
///
/// Membership means "already searched from here without finding a win".
/// Evicting an entry can only cause a state to be searched again.
pub struct TranspositionTable {
    /// Ring buffer of hashes in insertion order.
    ring: Vec<u32>,
    /// Membership index over `ring`.
    lookup: FxHashSet<u32>,
    /// Next slot to overwrite once the ring is full.
    write_index: usize,
    capacity: usize,
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let initial = capacity.min(TT_INITIAL_ALLOCATION);
        Self {
            ring: Vec::with_capacity(initial),
            lookup: FxHashSet::with_capacity_and_hasher(initial, Default::default()),
            write_index: 0,
            capacity,
        }
    }

    #[inline]
    pub fn contains(&self, hash: u32) -> bool {
        self.lookup.contains(&hash)
    }

    /// Records `hash`, evicting the oldest entry when full.
    pub fn insert(&mut self, hash: u32) {
        if !self.lookup.insert(hash) {
            return;
        }

        if self.ring.len() < self.capacity {
            self.ring.push(hash);
        } else {
            let evicted = std::mem::replace(&mut self.ring[self.write_index], hash);
            self.lookup.remove(&evicted);
            self.write_index = (self.write_index + 1) % self.capacity;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.lookup.clear();
        self.write_index = 0;
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_TT_CAPACITY)
    }
}

/// Hashes of states proven to lie on a winning line.
///
/// Unbounded and kept across solves, so re-analyzing anything reachable
/// from an earlier win is answered immediately.
#[derive(Debug, Default)]
pub struct WinnableStateCache {
    hashes: FxHashSet<u32>,
}

impl WinnableStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, hash: u32) -> bool {
        self.hashes.contains(&hash)
    }

    pub fn insert(&mut self, hash: u32) {
        self.hashes.insert(hash);
    }

    pub fn extend(&mut self, hashes: impl IntoIterator<Item = u32>) {
        self.hashes.extend(hashes);
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;

    #[test]
    fn test_hash_is_deterministic() {
        let state = GameState::deal(11);
        assert_eq!(hash_state(&state), hash_state(&state));
        assert_eq!(hash_state(&state), hash_state(&state.clone()));
    }

    #[test]
    fn test_stock_order_does_not_change_hash() {
        let mut state = GameState::deal(5);
        state.waste = state.stock.drain(..4).map(|c| c.with_face(true)).collect();
        let original = hash_state(&state);

        let mut shuffled = state.clone();
        shuffled.stock.reverse();
        // buried waste cards belong to the same pool
        let buried = shuffled.waste.remove(0);
        shuffled.stock.push(buried.with_face(false));
        assert_eq!(hash_state(&shuffled), original);
        assert_eq!(canonical_key(&shuffled), canonical_key(&state));
    }

    #[test]
    fn test_waste_top_changes_hash() {
        let mut state = GameState::deal(5);
        state.waste = state.stock.drain(..2).map(|c| c.with_face(true)).collect();
        let mut swapped = state.clone();
        swapped.waste.swap(0, 1);
        assert_ne!(canonical_key(&swapped), canonical_key(&state));
    }

    #[test]
    fn test_facing_changes_hash() {
        let state = GameState::deal(9);
        let mut flipped = state.clone();
        flipped.tableau[6][0].face_up = true;
        assert_ne!(hash_state(&flipped), hash_state(&state));
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_transposition_table_evicts_oldest() {
        let mut table = TranspositionTable::new(3);
        for hash in [10, 20, 30] {
            table.insert(hash);
        }
        table.insert(20);
        assert_eq!(table.len(), 3);

        table.insert(40);
        assert!(!table.contains(10));
        assert!(table.contains(20) && table.contains(30) && table.contains(40));

        table.insert(50);
        assert!(!table.contains(20));
        assert_eq!(table.len(), 3);

        table.clear();
        assert!(table.is_empty());
        assert!(!table.contains(30));
    }

    #[test]
    fn test_winnable_cache() {
        let mut cache = WinnableStateCache::new();
        cache.extend([1, 2, 3]);
        cache.insert(2);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(3));
    }

    #[test]
    fn test_face_up_ids_stay_below_separators() {
        let king_of_spades = Card::parse("Ks").unwrap().with_face(true);
        assert!((king_of_spades.id() | FACE_UP_BIT) < SECTION_SEPARATOR);
    }
}
