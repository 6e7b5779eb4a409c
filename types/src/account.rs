//! Account categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The category an account was registered under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A content creator.
    Influencer,
    /// A company or product account.
    Brand,
    /// Any other account.
    #[default]
    Member,
}

impl AccountType {
    /// Categories returned by the influencer-and-brand directory search.
    pub const PROMOTED: [AccountType; 2] = [AccountType::Influencer, AccountType::Brand];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Influencer => "influencer",
            Self::Brand => "brand",
            Self::Member => "member",
        }
    }

    /// Whether this account shows up in the influencer-and-brand search.
    pub fn is_promoted(&self) -> bool {
        Self::PROMOTED.contains(self)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "influencer" => Ok(Self::Influencer),
            "brand" => Ok(Self::Brand),
            "member" => Ok(Self::Member),
            other => Err(TypesError::UnknownAccountType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promoted_categories() {
        assert!(AccountType::Influencer.is_promoted());
        assert!(AccountType::Brand.is_promoted());
        assert!(!AccountType::Member.is_promoted());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Brand".parse::<AccountType>(), Ok(AccountType::Brand));
        assert!("admin".parse::<AccountType>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&AccountType::Influencer).unwrap();
        assert_eq!(json, "\"influencer\"");
    }
}
