use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Alias that wins the default-server election when configured.
pub const DEFAULT_ALIAS: &str = "personal";

/// Synthetic alias reported when no servers are configured at all.
const SYNTHETIC_ALIAS: &str = "default";

/// Ordered alias → server id table, populated once at startup and replaced
/// wholesale, never mutated at runtime. Alias comparison is
/// case-insensitive; insertion order decides the default when no entry is
/// keyed "personal".
///
/// Values are not validated against the servers the bot actually joined;
/// a dangling alias is a resolution failure at call time, not a startup
/// error.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    entries: Vec<(String, String)>,
}

impl ServerRegistry {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Look up a server id by alias, case-insensitively.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(alias))
            .map(|(_, id)| id.as_str())
    }

    /// The alias used when a caller supplies no server hint: "personal" if
    /// present, else the first-inserted entry, else a synthetic fallback
    /// that resolves to nothing.
    pub fn default_alias(&self) -> &str {
        if self.get(DEFAULT_ALIAS).is_some() {
            return DEFAULT_ALIAS;
        }
        self.entries
            .first()
            .map(|(a, _)| a.as_str())
            .unwrap_or(SYNTHETIC_ALIAS)
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.entries.iter().map(|(a, _)| a.as_str()).collect()
    }

    /// Entries in insertion order; user resolution searches servers in this
    /// order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, id)| (a.as_str(), id.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runtime-mutable friendly-alias → user id table. Keys are stored and
/// queried lower-cased. Lives for the process only; nothing is persisted.
#[derive(Debug, Default)]
pub struct UserAliases {
    map: RwLock<HashMap<String, String>>,
}

impl UserAliases {
    pub fn new(seed: HashMap<String, String>) -> Self {
        let map = seed
            .into_iter()
            .map(|(alias, id)| (alias.to_lowercase(), id))
            .collect();
        Self {
            map: RwLock::new(map),
        }
    }

    pub fn get(&self, alias: &str) -> Option<String> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&alias.to_lowercase())
            .cloned()
    }

    pub fn insert(&self, alias: &str, user_id: &str) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_lowercase(), user_id.to_string());
    }
}
