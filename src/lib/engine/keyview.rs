//! `KeyView`: lazy name-based iteration, indexing, sorting, and filtering
//! over an indexed source's `names` table.
//!
//! Filtering is expressed as an explicit [`Predicate`] value type rather
//! than operator overloading, since Rust has no analogue for
//! `fastx.filter(fastx.length >= 200)`.

use crate::engine::index_store::IndexStore;
use crate::error::{FxiError, Result};

/// A single filter condition; [`KeyView::filter`] ANDs a slice of these.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Sequence length compared against a fixed value.
    LenCmp(CmpOp, u64),
    /// Sequence length within `[lo, hi]`, inclusive.
    LenRange(u64, u64),
    /// Name starts with the given prefix.
    NamePrefix(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl CmpOp {
    fn apply(self, a: u64, b: u64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Eq => a == b,
            CmpOp::Ge => a >= b,
            CmpOp::Gt => a > b,
        }
    }
}

/// Field to sort ordinals by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ordinal (file) order; the identity sort.
    Id,
    Name,
    Length,
}

/// A read-only, lazily-evaluated view over a source's record names.
pub struct KeyView<'a> {
    store: &'a IndexStore,
}

impl<'a> KeyView<'a> {
    #[must_use]
    pub fn new(store: &'a IndexStore) -> KeyView<'a> {
        KeyView { store }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Name at `index`, 0-based, negative indices counting from the end
    /// (`-1` is the last record).
    pub fn get(&self, index: i64) -> Result<&[u8]> {
        let len = self.len() as i64;
        let ord = if index < 0 { index + len } else { index };
        if ord < 0 || ord >= len {
            return Err(FxiError::OutOfRange { ord: index, len: self.len() });
        }
        self.store.name(ord as u64)
    }

    #[must_use]
    pub fn contains(&self, name: &[u8]) -> bool {
        self.store.ordinal_of(name).is_ok()
    }

    /// Iterates `(ordinal, name)` pairs in on-disk (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.store.ordinals_in_order().map(move |ord| (ord, self.store.name(ord).expect("ordinal in range")))
    }

    /// Ordinals sorted by `key`, ascending unless `reverse`.
    #[must_use]
    pub fn sort(&self, key: SortKey, reverse: bool) -> Vec<u64> {
        let mut ordinals: Vec<u64> = self.store.ordinals_in_order().collect();
        ordinals.sort_by(|&a, &b| match key {
            SortKey::Id => a.cmp(&b),
            SortKey::Name => self.store.name(a).unwrap().cmp(self.store.name(b).unwrap()),
            SortKey::Length => {
                let la = self.store.record(a).unwrap().seq_length;
                let lb = self.store.record(b).unwrap().seq_length;
                la.cmp(&lb)
            }
        });
        if reverse {
            ordinals.reverse();
        }
        ordinals
    }

    /// Ordinals whose record satisfies every predicate in `predicates`
    /// (logical AND), in on-disk order.
    #[must_use]
    pub fn filter(&self, predicates: &[Predicate]) -> Vec<u64> {
        self.store
            .ordinals_in_order()
            .filter(|&ord| predicates.iter().all(|p| self.matches(ord, p)))
            .collect()
    }

    fn matches(&self, ord: u64, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::LenCmp(op, value) => {
                let len = self.store.record(ord).expect("ordinal in range").seq_length;
                op.apply(len, *value)
            }
            Predicate::LenRange(lo, hi) => {
                let len = self.store.record(ord).expect("ordinal in range").seq_length;
                len >= *lo && len <= *hi
            }
            Predicate::NamePrefix(prefix) => self.store.name(ord).expect("ordinal in range").starts_with(prefix.as_slice()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::index_store::{Format, Meta, RecordEntry, SeqType};
    use crate::engine::line_geometry::Terminator;
    use std::path::PathBuf;

    fn build(names_and_lengths: &[(&str, u64)]) -> IndexStore {
        let mut names_blob = Vec::new();
        let mut records = Vec::new();
        for (name, len) in names_and_lengths {
            let name_offset = names_blob.len() as u64;
            names_blob.extend_from_slice(name.as_bytes());
            records.push(RecordEntry {
                desc_offset: 0,
                desc_length: 0,
                seq_offset: 0,
                seq_length: *len,
                qual_offset: u64::MAX,
                name_offset,
                name_len: name.len() as u32,
                line_net: 60,
                line_len: 61,
                terminator: Terminator::Lf,
                irregular: false,
                g_count: 0,
                c_count: 0,
                a_count: 0,
                t_count: 0,
                n_count: 0,
                other_count: 0,
            });
        }
        let meta = Meta {
            format: Format::Fasta,
            source_path: PathBuf::from("x.fa"),
            source_is_gzip: false,
            source_size: 0,
            full_name: false,
            record_count: records.len() as u64,
            seq_type: SeqType::Dna,
        };
        IndexStore::build(meta, records, names_blob, None)
    }

    #[test]
    fn test_negative_index() {
        let store = build(&[("a", 1), ("b", 2), ("c", 3)]);
        let view = KeyView::new(&store);
        assert_eq!(view.get(-1).unwrap(), b"c");
        assert_eq!(view.get(-3).unwrap(), b"a");
        assert!(view.get(-4).is_err());
    }

    #[test]
    fn test_sort_by_length_reverse() {
        let store = build(&[("a", 5), ("b", 1), ("c", 9)]);
        let view = KeyView::new(&store);
        let ordinals = view.sort(SortKey::Length, true);
        assert_eq!(ordinals, vec![2, 0, 1]);
    }

    #[test]
    fn test_filter_len_range_and_prefix() {
        let store = build(&[("chr1", 100), ("chr2", 500), ("scaffold1", 500)]);
        let view = KeyView::new(&store);
        let hits = view.filter(&[Predicate::LenRange(200, 1000), Predicate::NamePrefix(b"chr".to_vec())]);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_contains() {
        let store = build(&[("a", 1)]);
        let view = KeyView::new(&store);
        assert!(view.contains(b"a"));
        assert!(!view.contains(b"z"));
    }
}
