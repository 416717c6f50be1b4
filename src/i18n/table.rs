//! Translation tables: `namespace -> key -> text` for one language.

use std::collections::HashMap;

pub type Namespace = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    code: String,
    namespaces: HashMap<String, Namespace>,
    /// Namespaces that failed to load and are held as empty maps
    failed: Vec<String>,
}

impl TranslationTable {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            namespaces: HashMap::new(),
            failed: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn insert_namespace(&mut self, namespace: impl Into<String>, entries: Namespace) {
        self.namespaces.insert(namespace.into(), entries);
    }

    /// Record a namespace whose load failed. It resolves as empty.
    pub fn insert_failed(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.namespaces.insert(namespace.clone(), Namespace::new());
        self.failed.push(namespace);
    }

    /// Look up a key. Empty strings count as missing so that a blank entry
    /// falls through to the next tier.
    pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
        self.namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    pub fn namespace(&self, namespace: &str) -> Option<&Namespace> {
        self.namespaces.get(namespace)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn failed_namespaces(&self) -> &[String] {
        &self.failed
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
