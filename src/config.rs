//! Growth policy: the ascending size-class sequence and the load limit.

/// Default bucket-array capacities. Primes, each roughly double the last.
pub const DEFAULT_SIZE_CLASSES: &[usize] = &[
    7, 17, 37, 79, 163, 331, 673, 1361, 2729, 5471, 10949, 21911, 43853, 87719, 175447, 350899,
    701819, 1403641, 2807303, 5614657, 11229331, 22458671, 44917381, 89834777, 179669557,
    359339171, 718678369, 1437356741, 2147483647,
];

/// Default resize threshold as a fraction of capacity.
pub const DEFAULT_LOAD_LIMIT: f64 = 0.72;

/// Sizing policy for a [`Dict`](crate::Dict).
///
/// The table starts at `size_classes[0]` buckets and moves to the next
/// class whenever inserting one more entry would push the load past
/// `load_limit`. Invalid values are programmer errors and panic in the
/// setters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    size_classes: &'static [usize],
    load_limit: f64,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            size_classes: DEFAULT_SIZE_CLASSES,
            load_limit: DEFAULT_LOAD_LIMIT,
        }
    }

    /// Replace the capacity sequence. Must be non-empty, start above zero
    /// and be strictly ascending.
    pub fn size_classes(mut self, classes: &'static [usize]) -> Self {
        assert!(!classes.is_empty(), "size-class sequence must not be empty");
        assert!(classes[0] > 0, "size classes must be non-zero");
        assert!(
            classes.windows(2).all(|w| w[0] < w[1]),
            "size classes must be strictly ascending"
        );
        self.size_classes = classes;
        self
    }

    /// Replace the load limit. Must be finite and positive.
    pub fn load_limit(mut self, limit: f64) -> Self {
        assert!(
            limit.is_finite() && limit > 0.0,
            "load limit must be finite and positive"
        );
        self.load_limit = limit;
        self
    }

    pub fn classes(&self) -> &'static [usize] {
        self.size_classes
    }

    pub fn limit(&self) -> f64 {
        self.load_limit
    }

    /// Capacity of size class `idx`. Panics when `idx` is out of range.
    #[inline]
    pub(crate) fn capacity_of(&self, idx: usize) -> usize {
        assert!(idx < self.size_classes.len(), "size-class index out of range");
        self.size_classes[idx]
    }

    #[inline]
    pub(crate) fn last_class(&self) -> usize {
        self.size_classes.len() - 1
    }

    /// Whether holding `entries` entries in `capacity` buckets exceeds the
    /// load limit.
    #[inline]
    pub(crate) fn over_limit(&self, capacity: usize, entries: usize) -> bool {
        (capacity as f64) * self.load_limit < entries as f64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
