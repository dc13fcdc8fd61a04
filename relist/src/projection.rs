//! Attribute projection for serialized records
//!
//! A resource exposes either every column of its base model or an ordered
//! allow-list. Projection only ever trims base columns; nested association
//! collections are always kept as-is.
//!
//! # Example
//!
//! ```rust
//! use relist::projection::AttributeList;
//!
//! let list = AttributeList::only(["username", "id"]);
//! assert!(list.allows("id"));
//! assert!(!list.allows("password"));
//! assert!(AttributeList::All.allows("password"));
//! ```

use serde::{Deserialize, Serialize};

use crate::model::Record;
use crate::query::JoinSpec;

/// Which base columns a resource serializes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeList {
    /// Every column
    #[default]
    All,
    /// Only the listed columns; unknown names are ignored
    Only(Vec<String>),
}

impl AttributeList {
    /// Allow-list from any sequence of names
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Whether `field` survives projection
    pub fn allows(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == field),
        }
    }
}

impl From<Vec<String>> for AttributeList {
    fn from(names: Vec<String>) -> Self {
        Self::Only(names)
    }
}

impl<const N: usize> From<[&str; N]> for AttributeList {
    fn from(names: [&str; N]) -> Self {
        Self::only(names)
    }
}

/// Trim a record to the allowed base columns, keeping association collections
pub fn project(record: Record, allow_list: &AttributeList, associations: &JoinSpec) -> Record {
    match allow_list {
        AttributeList::All => record,
        AttributeList::Only(_) => record
            .into_iter()
            .filter(|(field, _)| allow_list.allows(field) || associations.is_alias(field))
            .collect(),
    }
}
