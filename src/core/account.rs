use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for an account in the transaction batch.
///
/// An account has no standalone attributes; it exists exactly when it
/// appears as sender or receiver of at least one retained transaction.
///
/// # Examples
///
/// ```
/// use mule_detector::core::account::AccountId;
///
/// let a = AccountId::new("ACC_54921");
/// let b = AccountId::new("ACC_10034");
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this account id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is the empty string (such rows are dropped at ingest).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_equality() {
        let a = AccountId::new("ACC_001");
        let b = AccountId::new("ACC_001");
        let c = AccountId::new("ACC_002");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_account_display() {
        let a = AccountId::new("ACC_54921");
        assert_eq!(format!("{}", a), "ACC_54921");
    }

    #[test]
    fn test_account_ordering() {
        let a = AccountId::new("ACC_A");
        let b = AccountId::new("ACC_B");
        assert!(a < b);
    }
}
