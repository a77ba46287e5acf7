//! Key/value tuples returned by table cursors

/// One `(key, value)` row of a sorted table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Tuple<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}
