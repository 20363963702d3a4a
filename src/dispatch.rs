//! The pipe-delimited dispatch convention shared by `data-call`, `data-send`, `data-ignore` and
//! friends, plus the receiver table updates are fanned out through.

use crate::util::HashMapList;

/// Separator for attribute values carrying multiple names.
pub const SEPARATOR: char = '|';

/// Split a pipe-delimited attribute value into its names, dropping empty segments.
pub fn pipe_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Names exempted from call/send dispatch, parsed from the controller element's own
/// `data-ignore` attribute. The scope is that one element; descendants are not consulted.
pub struct IgnoreList(Vec<String>);

impl IgnoreList {
    pub fn parse(raw: Option<String>) -> Self {
        Self(
            raw.as_deref()
                .map(|raw| pipe_list(raw).map(str::to_string).collect())
                .unwrap_or_default(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|ignored| ignored == name)
    }
}

/// Registered update sinks: each entry pairs an update key with the element that declared it via
/// `data-r`. Duplicate keys fan out to every registered element, in subtree scan order.
pub struct ReceiverSet<El> {
    entries: HashMapList<String, El>,
}

impl<El: Clone> ReceiverSet<El> {
    pub fn new() -> Self {
        Self {
            entries: HashMapList::new(),
        }
    }

    /// Drop every entry. The table is rebuilt on every subtree scan.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn register(&mut self, key: &str, el: El) {
        self.entries.insert(key.to_string(), el);
    }

    /// Every element registered under `key`, in registration order.
    pub fn matching(&self, key: &str) -> &[El] {
        self.entries.get(key).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<El: Clone> Default for ReceiverSet<El> {
    fn default() -> Self {
        Self::new()
    }
}
