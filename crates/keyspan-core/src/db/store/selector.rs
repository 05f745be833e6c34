///
/// KeySelector
///
/// Names a key position relative to a reference key: the last key that is
/// `< key` (or `<= key` when `or_equal`), then moved `offset` keys forward.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeySelector {
    pub key: Vec<u8>,
    pub or_equal: bool,
    pub offset: i32,
}

impl KeySelector {
    #[must_use]
    pub fn new(key: &[u8], or_equal: bool, offset: i32) -> Self {
        Self {
            key: key.to_vec(),
            or_equal,
            offset,
        }
    }

    #[must_use]
    pub fn first_greater_or_equal(key: &[u8]) -> Self {
        Self::new(key, false, 1)
    }

    #[must_use]
    pub fn first_greater_than(key: &[u8]) -> Self {
        Self::new(key, true, 1)
    }

    #[must_use]
    pub fn last_less_or_equal(key: &[u8]) -> Self {
        Self::new(key, true, 0)
    }

    #[must_use]
    pub fn last_less_than(key: &[u8]) -> Self {
        Self::new(key, false, 0)
    }

    /// Shift the selector by `delta` keys.
    #[must_use]
    pub fn add(mut self, delta: i32) -> Self {
        self.offset = self.offset.saturating_add(delta);
        self
    }
}
