use crate::feature::FeatureKey;

/// Deterministic feature set backed by a bitset.
///
/// Membership is by `FeatureKey`, so two features with equal contents are
/// still distinct members. Used to track which features are hovered.
///
/// Ordering contract:
/// - Iteration yields keys in ascending order, which for keys handed out by
///   one `FeatureSet` is the order the features entered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    words: Vec<u64>,
    len: usize,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, key: FeatureKey) -> bool {
        let (word, bit) = word_bit(key.index());
        self.words
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0)
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, key: FeatureKey) -> bool {
        let (word, bit) = word_bit(key.index());
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let w = &mut self.words[word];
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        self.len += 1;
        true
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, key: FeatureKey) -> bool {
        let (word, bit) = word_bit(key.index());
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let mask = 1u64 << bit;
        if (*w & mask) == 0 {
            return false;
        }
        *w &= !mask;
        self.len -= 1;
        true
    }

    /// Set difference: `self \ other`.
    pub fn diff(&self, other: &Self) -> Self {
        let mut out = self.clone();
        let min_words = other.words.len().min(out.words.len());
        for idx in 0..min_words {
            out.words[idx] &= !other.words[idx];
        }
        out.len = out.words.iter().map(|w| w.count_ones() as usize).sum();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureKey> + '_ {
        SelectionIter {
            words: &self.words,
            word_index: 0,
            current_word: 0,
            base_index: 0,
        }
    }
}

impl FromIterator<FeatureKey> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = FeatureKey>>(iter: I) -> Self {
        let mut s = SelectionSet::new();
        for key in iter {
            s.insert(key);
        }
        s
    }
}

fn word_bit(index: u32) -> (usize, u32) {
    ((index / 64) as usize, index % 64)
}

struct SelectionIter<'a> {
    words: &'a [u64],
    word_index: usize,
    current_word: u64,
    base_index: u32,
}

impl Iterator for SelectionIter<'_> {
    type Item = FeatureKey;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let tz = self.current_word.trailing_zeros();
                self.current_word &= !(1u64 << tz);
                return Some(FeatureKey(self.base_index + tz));
            }

            let w = *self.words.get(self.word_index)?;
            self.current_word = w;
            self.base_index = (self.word_index as u32) * 64;
            self.word_index += 1;
        }
    }
}
