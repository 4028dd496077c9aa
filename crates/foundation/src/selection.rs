use crate::ids::Slot;

const WORD_BITS: u32 = u64::BITS;

/// Set of repository slots backed by a bitset.
///
/// Iteration yields slots in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSet {
    words: Vec<u64>,
    len: usize,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, slot: Slot) -> bool {
        let (word, mask) = locate(slot);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns `true` if `slot` was not already present.
    pub fn insert(&mut self, slot: Slot) -> bool {
        let (word, mask) = locate(slot);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let fresh = self.words[word] & mask == 0;
        if fresh {
            self.words[word] |= mask;
            self.len += 1;
        }
        fresh
    }

    /// Returns `true` if `slot` was present.
    pub fn remove(&mut self, slot: Slot) -> bool {
        let (word, mask) = locate(slot);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    /// Keeps only the slots also present in `other`.
    pub fn intersect_in_place(&mut self, other: &Self) {
        self.words.truncate(other.words.len());
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine &= theirs;
        }
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(Slot) -> bool) {
        for (word, bits) in self.words.iter_mut().enumerate() {
            let mut rest = *bits;
            while rest != 0 {
                let bit = rest.trailing_zeros();
                rest &= rest - 1;
                if !keep(Slot(word as u32 * WORD_BITS + bit)) {
                    *bits &= !(1u64 << bit);
                    self.len -= 1;
                }
            }
        }
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let theirs = other.words.get(i).copied().unwrap_or(0);
            w & !theirs == 0
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.words.iter().enumerate().flat_map(|(word, &bits)| {
            let base = word as u32 * WORD_BITS;
            std::iter::successors((bits != 0).then_some(bits), |rest| {
                let next = rest & (rest - 1);
                (next != 0).then_some(next)
            })
            .map(move |rest| Slot(base + rest.trailing_zeros()))
        })
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        let mut set = SlotSet::new();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

fn locate(slot: Slot) -> (usize, u64) {
    let index = slot.index();
    ((index / WORD_BITS) as usize, 1u64 << (index % WORD_BITS))
}
