use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::DedupHash;

/// Hashes of the links already downloaded for one provider, in discovery order.
///
/// Append-only: there is no removal and no pruning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<DedupHash>", into = "Vec<DedupHash>")]
pub struct ProviderState {
    order: Vec<DedupHash>,
    index: HashSet<DedupHash>,
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &DedupHash) -> bool {
        self.index.contains(hash)
    }

    /// Appends `hash` unless it is already present. Returns whether it was added.
    pub fn push(&mut self, hash: DedupHash) -> bool {
        if !self.index.insert(hash.clone()) {
            return false;
        }
        self.order.push(hash);
        true
    }

    /// Union with `other`: own order first, then `other`'s unseen hashes in their order.
    pub fn merge(&mut self, other: &ProviderState) {
        for hash in other.iter() {
            self.push(hash.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DedupHash> {
        self.order.iter()
    }
}

impl PartialEq for ProviderState {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for ProviderState {}

impl From<Vec<DedupHash>> for ProviderState {
    fn from(hashes: Vec<DedupHash>) -> Self {
        let mut state = ProviderState::new();
        for hash in hashes {
            state.push(hash);
        }
        state
    }
}

impl From<ProviderState> for Vec<DedupHash> {
    fn from(state: ProviderState) -> Self {
        state.order
    }
}

impl FromIterator<DedupHash> for ProviderState {
    fn from_iter<I: IntoIterator<Item = DedupHash>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// Provider name to seen-hash list. Serialized as `{ "<provider>": ["<hash>", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    providers: BTreeMap<String, ProviderState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `provider`, empty when the provider was never seen.
    pub fn get(&self, provider: &str) -> ProviderState {
        self.providers.get(provider).cloned().unwrap_or_default()
    }

    /// Replaces the entry for `provider`.
    pub fn set(&mut self, provider: impl Into<String>, state: ProviderState) {
        self.providers.insert(provider.into(), state);
    }

    /// Unions `state` into the entry for `provider`, creating it if needed.
    pub fn merge_provider(&mut self, provider: &str, state: &ProviderState) {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .merge(state);
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
