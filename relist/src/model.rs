//! Model schema: attributes, primary keys and declared associations
//!
//! A [`Model`] describes one relational table as far as list resources are
//! concerned. Associations are declared with an explicit [`AssociationKind`],
//! and the [`Cardinality`] used by the pagination engine is always derived
//! from that kind, never from data.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use relist::model::{AttributeType, Cardinality, Model};
//!
//! let hobby = Arc::new(
//!     Model::new("hobby")
//!         .attribute("id", AttributeType::Integer)
//!         .attribute("name", AttributeType::Text),
//! );
//!
//! let user = Model::new("users")
//!     .attribute("id", AttributeType::Integer)
//!     .attribute("username", AttributeType::Text)
//!     .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id");
//!
//! let hobbies = user.association("hobbies").unwrap();
//! assert_eq!(hobbies.kind.cardinality(), Cardinality::Many);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single row of any table, keyed by column name
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Column type of a model attribute
///
/// Used to coerce request-supplied filter strings into typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Text / varchar
    Text,
    /// Boolean
    Boolean,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A named, typed column of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Column name
    pub name: String,
    /// Column type
    pub kind: AttributeType,
}

/// How many associated rows a single base row can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one associated row (belongs-to, has-one)
    One,
    /// Any number of associated rows (has-many, belongs-to-many)
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "one"),
            Self::Many => write!(f, "many"),
        }
    }
}

/// Declared shape of an association, including the keys needed to join it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationKind {
    /// The source row holds `foreign_key` pointing at the target primary key
    BelongsTo {
        /// Column on the source table
        foreign_key: String,
    },
    /// The target row holds `foreign_key` pointing at the source primary key
    HasOne {
        /// Column on the target table
        foreign_key: String,
    },
    /// Target rows hold `foreign_key` pointing at the source primary key
    HasMany {
        /// Column on the target table
        foreign_key: String,
    },
    /// Source and target are linked through a join table
    BelongsToMany {
        /// Join table name
        through: String,
        /// Join table column referencing the source primary key
        source_key: String,
        /// Join table column referencing the target primary key
        target_key: String,
    },
}

impl AssociationKind {
    /// Cardinality implied by the declared association type
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        match self {
            Self::BelongsTo { .. } | Self::HasOne { .. } => Cardinality::One,
            Self::HasMany { .. } | Self::BelongsToMany { .. } => Cardinality::Many,
        }
    }
}

/// A declared relationship from one model to another
#[derive(Debug, Clone)]
pub struct Association {
    /// Name under which associated rows are nested in a record
    pub alias: String,
    /// The associated model
    pub target: Arc<Model>,
    /// Association type and join keys
    pub kind: AssociationKind,
}

/// Table metadata for a list resource's base entity or an associated entity
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    table: String,
    primary_key: String,
    attributes: Vec<Attribute>,
    associations: Vec<Association>,
}

impl Model {
    /// Create a model whose table shares its name and whose primary key is `id`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            primary_key: "id".to_string(),
            attributes: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Override the table name
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Override the primary key column
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Declare an attribute; redeclaring a name replaces its type
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, kind: AttributeType) -> Self {
        let name = name.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.kind = kind,
            None => self.attributes.push(Attribute { name, kind }),
        }
        self
    }

    /// Declare a belongs-to association (ONE)
    #[must_use]
    pub fn belongs_to(
        self,
        alias: impl Into<String>,
        target: &Arc<Model>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associate(
            alias,
            target,
            AssociationKind::BelongsTo {
                foreign_key: foreign_key.into(),
            },
        )
    }

    /// Declare a has-one association (ONE)
    #[must_use]
    pub fn has_one(
        self,
        alias: impl Into<String>,
        target: &Arc<Model>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associate(
            alias,
            target,
            AssociationKind::HasOne {
                foreign_key: foreign_key.into(),
            },
        )
    }

    /// Declare a has-many association (MANY)
    #[must_use]
    pub fn has_many(
        self,
        alias: impl Into<String>,
        target: &Arc<Model>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associate(
            alias,
            target,
            AssociationKind::HasMany {
                foreign_key: foreign_key.into(),
            },
        )
    }

    /// Declare a belongs-to-many association through a join table (MANY)
    #[must_use]
    pub fn belongs_to_many(
        self,
        alias: impl Into<String>,
        target: &Arc<Model>,
        through: impl Into<String>,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        self.associate(
            alias,
            target,
            AssociationKind::BelongsToMany {
                through: through.into(),
                source_key: source_key.into(),
                target_key: target_key.into(),
            },
        )
    }

    fn associate(
        mut self,
        alias: impl Into<String>,
        target: &Arc<Model>,
        kind: AssociationKind,
    ) -> Self {
        let alias = alias.into();
        self.associations.retain(|a| a.alias != alias);
        self.associations.push(Association {
            alias,
            target: Arc::clone(target),
            kind,
        });
        self
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Primary key column
    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    /// Declared attributes, in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by name
    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of all text attributes, used as default search fields
    pub fn text_attributes(&self) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| a.kind == AttributeType::Text)
            .map(|a| a.name.clone())
            .collect()
    }

    /// Declared associations
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Look up an association by alias
    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hobby() -> Arc<Model> {
        Arc::new(
            Model::new("hobby")
                .attribute("id", AttributeType::Integer)
                .attribute("name", AttributeType::Text),
        )
    }

    #[test]
    fn test_cardinality_derived_from_kind() {
        let fk = || "user_id".to_string();
        assert_eq!(
            AssociationKind::BelongsTo { foreign_key: fk() }.cardinality(),
            Cardinality::One
        );
        assert_eq!(
            AssociationKind::HasOne { foreign_key: fk() }.cardinality(),
            Cardinality::One
        );
        assert_eq!(
            AssociationKind::HasMany { foreign_key: fk() }.cardinality(),
            Cardinality::Many
        );
        assert_eq!(
            AssociationKind::BelongsToMany {
                through: "user_hobbies".to_string(),
                source_key: fk(),
                target_key: "hobby_id".to_string(),
            }
            .cardinality(),
            Cardinality::Many
        );
    }

    #[test]
    fn test_model_defaults() {
        let model = Model::new("users");
        assert_eq!(model.name(), "users");
        assert_eq!(model.table_name(), "users");
        assert_eq!(model.primary_key_column(), "id");
    }

    #[test]
    fn test_attribute_redeclared() {
        let model = Model::new("users")
            .attribute("age", AttributeType::Text)
            .attribute("age", AttributeType::Integer);
        assert_eq!(model.attributes().len(), 1);
        assert_eq!(
            model.find_attribute("age").map(|a| a.kind),
            Some(AttributeType::Integer)
        );
    }

    #[test]
    fn test_text_attributes() {
        let model = Model::new("users")
            .attribute("id", AttributeType::Integer)
            .attribute("username", AttributeType::Text)
            .attribute("email", AttributeType::Text)
            .attribute("active", AttributeType::Boolean);
        assert_eq!(model.text_attributes(), vec!["username", "email"]);
    }

    #[test]
    fn test_association_lookup() {
        let hobby = hobby();
        let model = Model::new("users").belongs_to_many(
            "hobbies",
            &hobby,
            "user_hobbies",
            "user_id",
            "hobby_id",
        );
        let association = model.association("hobbies").unwrap();
        assert_eq!(association.target.table_name(), "hobby");
        assert!(model.association("pets").is_none());
    }

    #[test]
    fn test_association_redeclared_replaces() {
        let hobby = hobby();
        let model = Model::new("users")
            .has_many("hobbies", &hobby, "user_id")
            .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id");
        assert_eq!(model.associations().len(), 1);
        assert!(matches!(
            model.association("hobbies").unwrap().kind,
            AssociationKind::BelongsToMany { .. }
        ));
    }
}
