//! Transposition table, keyed by position hash.
//!
//! Every slot holds at most one entry, at index `hash % len`, and inserts overwrite unconditionally.
//! An entry is validated only by comparing the stored 64-bit hash with the probe hash, so a hash collision can return a bound from an unrelated position.

use std::mem;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use num_traits::NumCast;

use crate::search::game::Utility;
use crate::search::SearchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    LowerBound,
    UpperBound,
}

impl Bound {
    fn to_bits(self) -> u64 {
        match self {
            Bound::Exact => 0,
            Bound::LowerBound => 1,
            Bound::UpperBound => 2,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            1 => Bound::LowerBound,
            2 => Bound::UpperBound,
            _ => Bound::Exact,
        }
    }
}

/// How concurrent access to the table is synchronized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TableMode {
    /// Every probe and insert takes a single table-wide lock.
    #[default]
    Locked,
    /// Lock-free slots built from relaxed atomics.
    ///
    /// An entry is spread over three independent words, so two threads writing the same slot at once can leave behind a mix of both entries, and a reader can observe a half-written one. Such an entry is still memory safe, but may return a wrong bound for the probed hash.
    /// This trades a small risk of search errors for not serializing every parallel worker on one lock. Only enable it when that trade-off is acceptable.
    Relaxed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry<U> {
    hash: u64,
    kind: Bound,
    depth: u16,
    score: U,
    hint: Option<u16>,
}

// Layout of `RelaxedSlot::meta`
const OCCUPIED_BIT: u64 = 1;
const KIND_SHIFT: u32 = 1;
const DEPTH_SHIFT: u32 = 3;
const HINT_PRESENT_BIT: u64 = 1 << 19;
const HINT_SHIFT: u32 = 20;

#[derive(Debug, Default)]
struct RelaxedSlot {
    hash: AtomicU64,
    score: AtomicI64,
    meta: AtomicU64,
}

impl RelaxedSlot {
    fn store<U: Utility>(&self, entry: Entry<U>) {
        let Some(score) = entry.score.to_i64() else {
            return;
        };
        let mut meta = OCCUPIED_BIT
            | (entry.kind.to_bits() << KIND_SHIFT)
            | ((entry.depth as u64) << DEPTH_SHIFT);
        if let Some(hint) = entry.hint {
            meta |= HINT_PRESENT_BIT | ((hint as u64) << HINT_SHIFT);
        }
        self.hash.store(entry.hash, Ordering::Relaxed);
        self.score.store(score, Ordering::Relaxed);
        self.meta.store(meta, Ordering::Relaxed);
    }

    fn load<U: Utility>(&self) -> Option<Entry<U>> {
        let meta = self.meta.load(Ordering::Relaxed);
        if meta & OCCUPIED_BIT == 0 {
            return None;
        }
        let hash = self.hash.load(Ordering::Relaxed);
        let score = <U as NumCast>::from(self.score.load(Ordering::Relaxed))?;
        let hint = if meta & HINT_PRESENT_BIT != 0 {
            Some((meta >> HINT_SHIFT) as u16)
        } else {
            None
        };
        Some(Entry {
            hash,
            kind: Bound::from_bits(meta >> KIND_SHIFT),
            depth: (meta >> DEPTH_SHIFT) as u16,
            score,
            hint,
        })
    }

    fn clear(&self) {
        self.meta.store(0, Ordering::Relaxed);
        self.hash.store(0, Ordering::Relaxed);
        self.score.store(0, Ordering::Relaxed);
    }
}

enum Slots<U> {
    Locked(Mutex<Box<[Option<Entry<U>>]>>),
    Relaxed(Box<[RelaxedSlot]>),
}

pub struct TranspositionTable<U> {
    slots: Slots<U>,
    len: usize,
    unknown: U,
}

impl<U: Utility> TranspositionTable<U> {
    /// Allocates a table of `requested_len` slots.
    ///
    /// If the allocation fails, the size is halved until it succeeds. Returns an error if the requested size is zero, or if not even a single slot could be allocated.
    /// `unknown` is the score returned by probes that miss.
    pub fn new(requested_len: usize, mode: TableMode, unknown: U) -> Result<Self, SearchError> {
        Self::with_memory_limit(requested_len, mode, unknown, total_memory())
    }

    /// Like `new`, but allocations of more than `memory_limit` bytes count as failed.
    fn with_memory_limit(
        requested_len: usize,
        mode: TableMode,
        unknown: U,
        memory_limit: Option<u64>,
    ) -> Result<Self, SearchError> {
        if requested_len == 0 {
            return Err(SearchError::InvalidTableSize(requested_len));
        }
        let (slots, len) = match mode {
            TableMode::Locked => {
                let slots = allocate_slots::<Option<Entry<U>>>(requested_len, memory_limit, || None)?;
                let len = slots.len();
                (Slots::Locked(Mutex::new(slots.into_boxed_slice())), len)
            }
            TableMode::Relaxed => {
                let slots = allocate_slots::<RelaxedSlot>(requested_len, memory_limit, RelaxedSlot::default)?;
                let len = slots.len();
                (Slots::Relaxed(slots.into_boxed_slice()), len)
            }
        };
        if len < requested_len {
            log::warn!(
                "Transposition table reduced from {} to {} entries",
                requested_len,
                len
            );
        }
        Ok(TranspositionTable {
            slots,
            len,
            unknown,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash % self.len as u64) as usize
    }

    /// Overwrites the slot for `hash`, whatever it held before.
    pub fn insert(&self, hash: u64, kind: Bound, score: U, depth: u16, hint: Option<u16>) {
        let index = self.index(hash);
        let entry = Entry {
            hash,
            kind,
            depth,
            score,
            hint,
        };
        match &self.slots {
            Slots::Locked(slots) => {
                if let Ok(mut slots) = slots.lock() {
                    slots[index] = Some(entry);
                }
            }
            Slots::Relaxed(slots) => slots[index].store(entry),
        }
    }

    /// Returns the stored score if it is usable for a search of `depth` with window `(alpha, beta)`, or the unknown score otherwise.
    pub fn probe(&self, hash: u64, alpha: U, beta: U, depth: u16) -> U {
        self.probe_with_hint(hash, alpha, beta, depth).0
    }

    /// Like `probe`, but also returns the stored best-action hint.
    ///
    /// The hint is returned whenever the hash matches, even if the stored score is too shallow or has the wrong bound to be used.
    pub fn probe_with_hint(&self, hash: u64, alpha: U, beta: U, depth: u16) -> (U, Option<u16>) {
        let Some(entry) = self.load(hash) else {
            return (self.unknown, None);
        };
        if entry.hash != hash {
            return (self.unknown, None);
        }
        let usable = entry.depth >= depth
            && match entry.kind {
                Bound::Exact => true,
                Bound::UpperBound => entry.score <= alpha,
                Bound::LowerBound => entry.score >= beta,
            };
        if usable {
            (entry.score, entry.hint)
        } else {
            (self.unknown, entry.hint)
        }
    }

    fn load(&self, hash: u64) -> Option<Entry<U>> {
        let index = self.index(hash);
        match &self.slots {
            Slots::Locked(slots) => slots.lock().ok().and_then(|slots| slots[index]),
            Slots::Relaxed(slots) => slots[index].load(),
        }
    }

    pub fn clear(&self) {
        match &self.slots {
            Slots::Locked(slots) => {
                if let Ok(mut slots) = slots.lock() {
                    slots.iter_mut().for_each(|slot| *slot = None);
                }
            }
            Slots::Relaxed(slots) => slots.iter().for_each(RelaxedSlot::clear),
        }
    }
}

/// Physical memory of the machine in bytes, if the platform can tell.
fn total_memory() -> Option<u64> {
    if sysinfo::IS_SUPPORTED_SYSTEM {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Some(sys.total_memory())
    } else {
        None
    }
}

fn allocate_slots<T>(
    requested_len: usize,
    memory_limit: Option<u64>,
    new_slot: impl Fn() -> T,
) -> Result<Vec<T>, SearchError> {
    let mut len = requested_len;
    while len > 0 {
        let num_bytes = len.saturating_mul(mem::size_of::<T>());
        // Don't let the OS overcommit something we can never use
        if memory_limit.is_some_and(|memory_limit| num_bytes as u64 > memory_limit) {
            len /= 2;
            continue;
        }
        let mut slots = Vec::new();
        match slots.try_reserve_exact(len) {
            Ok(()) => {
                slots.extend((0..len).map(|_| new_slot()));
                return Ok(slots);
            }
            Err(err) => {
                log::warn!(
                    "Failed to allocate {}MB for the transposition table: {}",
                    num_bytes / (1024 * 1024),
                    err
                );
                len /= 2;
            }
        }
    }
    Err(SearchError::TableAllocation(requested_len))
}

#[cfg(test)]
fn both_modes() -> [TranspositionTable<i32>; 2] {
    [
        TranspositionTable::new(1024, TableMode::Locked, i32::MIN).unwrap(),
        TranspositionTable::new(1024, TableMode::Relaxed, i32::MIN).unwrap(),
    ]
}

#[test]
fn exact_round_trip_test() {
    for tt in both_modes() {
        tt.insert(0xdead_beef, Bound::Exact, 17, 4, None);
        assert_eq!(tt.probe(0xdead_beef, 0, 100, 4), 17);
        assert_eq!(tt.probe(0xdead_beef, 0, 100, 3), 17);
        assert_eq!(tt.probe(0xdead_beef, 0, 100, 5), i32::MIN);
        assert_eq!(tt.probe(0xdead_bef0, 0, 100, 4), i32::MIN);
    }
}

#[test]
fn bounds_respect_window_test() {
    for tt in both_modes() {
        tt.insert(1, Bound::UpperBound, 10, 2, None);
        assert_eq!(tt.probe(1, 10, 20, 2), 10);
        assert_eq!(tt.probe(1, 9, 20, 2), i32::MIN);

        tt.insert(2, Bound::LowerBound, 10, 2, None);
        assert_eq!(tt.probe(2, 0, 10, 2), 10);
        assert_eq!(tt.probe(2, 0, 11, 2), i32::MIN);
    }
}

#[test]
fn collision_overwrites_slot_test() {
    for tt in both_modes() {
        let len = tt.len() as u64;
        tt.insert(5, Bound::Exact, 1, 1, None);
        tt.insert(5 + len, Bound::Exact, 2, 1, None);
        assert_eq!(tt.probe(5, -100, 100, 1), i32::MIN);
        assert_eq!(tt.probe(5 + len, -100, 100, 1), 2);
    }
}

#[test]
fn hint_survives_unusable_score_test() {
    for tt in both_modes() {
        tt.insert(42, Bound::Exact, -3, 1, Some(7));
        assert_eq!(tt.probe_with_hint(42, -10, 10, 6), (i32::MIN, Some(7)));
        assert_eq!(tt.probe_with_hint(42, -10, 10, 1), (-3, Some(7)));
        assert_eq!(tt.probe_with_hint(43, -10, 10, 1), (i32::MIN, None));
    }
}

#[test]
fn clear_test() {
    for tt in both_modes() {
        for hash in 0..200 {
            tt.insert(hash * 7919, Bound::Exact, hash as i32, 3, None);
        }
        tt.clear();
        for hash in 0..200 {
            assert_eq!(tt.probe(hash * 7919, i32::MIN + 1, i32::MAX, 0), i32::MIN);
        }
    }
}

#[test]
fn zero_size_is_rejected_test() {
    assert!(matches!(
        TranspositionTable::<i32>::new(0, TableMode::Locked, i32::MIN),
        Err(SearchError::InvalidTableSize(0))
    ));
}

#[test]
fn table_shrinks_to_fit_memory_test() {
    let slot_size = mem::size_of::<Option<Entry<i32>>>() as u64;
    let tt = TranspositionTable::with_memory_limit(1024, TableMode::Locked, i32::MIN, Some(100 * slot_size))
        .unwrap();
    assert_eq!(tt.len(), 64);

    let slot_size = mem::size_of::<RelaxedSlot>() as u64;
    let tt = TranspositionTable::with_memory_limit(1000, TableMode::Relaxed, i32::MIN, Some(300 * slot_size))
        .unwrap();
    assert_eq!(tt.len(), 250);
    tt.insert(7, Bound::Exact, 3, 1, None);
    assert_eq!(tt.probe(7, -10, 10, 1), 3);
}

#[test]
fn table_without_room_for_one_slot_fails_test() {
    for mode in [TableMode::Locked, TableMode::Relaxed] {
        assert!(matches!(
            TranspositionTable::<i32>::with_memory_limit(1024, mode, i32::MIN, Some(1)),
            Err(SearchError::TableAllocation(1024))
        ));
    }
}
