use std::{borrow::Borrow, collections::HashMap, hash::Hash};

/// Simple wrapper to make functionality easier for interfacing with `HashMap<K, Vec<V>>`. Handles
/// the logic surrounding initialising a new [Vec] when a new value is inserted with a unique key,
/// so key collisions append to the [Vec] rather than overwriting. Values for a given key keep
/// their insertion order.
pub struct HashMapList<K, V>(HashMap<K, Vec<V>>);

impl<K, V> HashMapList<K, V>
where
    K: Eq + PartialEq + Hash,
{
    /// Creates an empty [HashMapList].
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Retrieves a list of values by key. Will return [None] if there are no items that match the
    /// provided key.
    pub fn get<Q>(&self, k: &Q) -> Option<&[V]>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.0.get(k).map(|v| v.as_slice())
    }

    /// Inserts a value with a given key into the collection. If there is no existing [Vec] for the
    /// key, an empty one will be initialised before the value is inserted.
    pub fn insert(&mut self, k: K, v: V) {
        self.0.entry(k).or_default().push(v);
    }

    /// Removes every key and value.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Total count of values across all keys.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl<K, V> Default for HashMapList<K, V>
where
    K: Eq + PartialEq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
