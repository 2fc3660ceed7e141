//! The set of correlation attributes carried by one request.

use {
    crate::{RequestIdentity, headers},
    std::collections::{BTreeMap, btree_map},
};

/// Correlation attributes for a single request, keyed by reserved header name.
///
/// Keys are unique. Empty values are never stored, so every entry present is
/// something worth putting on a log line or an outbound request. The map is
/// built up while the identity is resolved and augmented, then handed to the
/// propagator as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationAttributes(BTreeMap<String, String>);

impl CorrelationAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value. Empty values are
    /// ignored and leave an existing entry untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layers the resolved identity over the forwarded attributes.
    ///
    /// The identity always wins: a forwarded `x-spinnaker-user` header can
    /// never replace the user that was actually resolved for this request.
    /// A resolved but empty field removes the forwarded value instead.
    pub fn with_identity(mut self, identity: &RequestIdentity) -> Self {
        if let Some(user) = identity.user() {
            self.0.remove(headers::USER);
            self.insert(headers::USER, user);
        }
        if let Some(accounts) = identity.accounts() {
            self.0.remove(headers::ACCOUNTS);
            self.insert(headers::ACCOUNTS, accounts);
        }
        self
    }
}

impl IntoIterator for CorrelationAttributes {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CorrelationAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}
