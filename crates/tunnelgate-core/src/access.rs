//! Identity allowlist.
//!
//! An empty allowlist admits every identity. Operators opt into restriction by
//! listing identities; leaving the list unset keeps the gateway open.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }
}

/// Set of identities allowed through the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    allowed: HashSet<String>,
}

impl AccessList {
    /// Build from configured entries. Entries are trimmed; blank entries are
    /// ignored.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { allowed }
    }

    /// Parse a comma-separated list such as `"alpha, beta ,gamma"`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// An allowlist with no entries, which admits everyone.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Number of listed identities.
    pub fn listed(&self) -> usize {
        self.allowed.len()
    }

    pub fn check(&self, identity: &str) -> AccessDecision {
        if self.is_open() || self.allowed.contains(identity) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_allows_everything() {
        let acl = AccessList::open();
        assert_eq!(acl.check("anything"), AccessDecision::Allow);
        assert_eq!(acl.check(""), AccessDecision::Allow);
    }

    #[test]
    fn test_csv_entries_are_trimmed() {
        let acl = AccessList::from_csv(" alpha, beta ,gamma ");
        assert_eq!(acl.listed(), 3);
        assert!(acl.check("alpha").is_allowed());
        assert!(acl.check("beta").is_allowed());
        assert!(acl.check("gamma").is_allowed());
        assert_eq!(acl.check("delta"), AccessDecision::Deny);
    }

    #[test]
    fn test_identity_is_not_trimmed() {
        let acl = AccessList::from_csv("alpha");
        assert_eq!(acl.check(" alpha"), AccessDecision::Deny);
    }

    #[test]
    fn test_blank_csv_is_open() {
        let acl = AccessList::from_csv(" , ,");
        assert!(acl.is_open());
        assert!(acl.check("whoever").is_allowed());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let acl = AccessList::new(["Alpha"]);
        assert_eq!(acl.check("alpha"), AccessDecision::Deny);
    }
}
