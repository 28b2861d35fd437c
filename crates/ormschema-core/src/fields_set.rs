//! Which fields of a schema instance were explicitly provided.
//!
//! Dumping with `exclude_unset` keeps only these fields, even when the
//! provided value happens to equal the default.

/// Bitset over the field indices `0..len` of one schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldsSet {
    len: usize,
    bits: Box<[u64]>,
}

impl FieldsSet {
    /// A set with no field marked.
    #[must_use]
    pub fn empty(len: usize) -> Self {
        Self {
            len,
            bits: vec![0u64; len.div_ceil(64)].into_boxed_slice(),
        }
    }

    /// A set with every field marked.
    #[must_use]
    pub fn all(len: usize) -> Self {
        let mut set = Self::empty(len);
        (0..len).for_each(|idx| set.insert(idx));
        set
    }

    /// Number of fields the set ranges over.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the set ranges over no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark a field. Out-of-range indices are ignored.
    pub fn insert(&mut self, idx: usize) {
        if idx >= self.len {
            return;
        }
        if let Some(word) = self.bits.get_mut(idx / 64) {
            *word |= 1u64 << (idx % 64);
        }
    }

    /// True if the field was marked.
    #[must_use]
    pub fn contains(&self, idx: usize) -> bool {
        idx < self.len
            && self
                .bits
                .get(idx / 64)
                .is_some_and(|word| word & (1u64 << (idx % 64)) != 0)
    }

    /// Number of marked fields.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Marked indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&idx| self.contains(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = FieldsSet::empty(70);
        set.insert(0);
        set.insert(65);
        set.insert(200);
        assert!(set.contains(0));
        assert!(set.contains(65));
        assert!(!set.contains(1));
        assert!(!set.contains(200));
        assert_eq!(set.count(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 65]);
    }

    #[test]
    fn test_all() {
        let set = FieldsSet::all(3);
        assert_eq!(set.count(), 3);
        assert!(FieldsSet::all(0).is_empty());
    }
}
