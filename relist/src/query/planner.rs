//! Association planning and reattachment
//!
//! Before query construction the planner turns a resource's includes into
//! join descriptors tagged with their cardinality. After rows come back from
//! the store it groups the flat joined rows under their owning base record.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::QueryError;
use super::plan::JoinedRow;
use crate::model::{AssociationKind, Cardinality, Model, Record};

/// An include as written in a resource registration
///
/// `model`, when given, must name the association's target model; it guards
/// against an alias silently resolving to a different entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeSpec {
    /// Expected target model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Association alias (`as`)
    #[serde(rename = "as")]
    pub alias: String,
}

impl IncludeSpec {
    /// Include an association by alias
    pub fn alias(alias: impl Into<String>) -> Self {
        Self {
            model: None,
            alias: alias.into(),
        }
    }

    /// Include an association by alias, checking its target model
    pub fn new(model: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            alias: alias.into(),
        }
    }
}

/// A resolved include, carrying the cardinality of its declared association
#[derive(Debug, Clone)]
pub struct AssociationInclude {
    /// Alias under which rows are nested
    pub alias: String,
    /// Associated model
    pub target: Arc<Model>,
    /// Declared association type and keys
    pub kind: AssociationKind,
    /// Derived from `kind`
    pub cardinality: Cardinality,
}

impl AssociationInclude {
    /// Resolve an include against the base model's declared associations
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::AssociationNotFound`] when the alias is not
    /// declared on `model`, or when it targets a different model than the
    /// include names.
    pub fn resolve(model: &Model, spec: &IncludeSpec) -> Result<Self, QueryError> {
        let not_found = || QueryError::AssociationNotFound {
            model: model.name().to_string(),
            alias: spec.alias.clone(),
        };

        let association = model.association(&spec.alias).ok_or_else(not_found)?;
        if let Some(expected) = spec.model.as_deref() {
            if association.target.name() != expected {
                return Err(not_found());
            }
        }

        Ok(Self {
            alias: association.alias.clone(),
            target: Arc::clone(&association.target),
            cardinality: association.kind.cardinality(),
            kind: association.kind.clone(),
        })
    }
}

/// Join descriptor for one included association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDescriptor {
    /// Join alias, also the nesting key in output records
    pub alias: String,
    /// Target table
    pub table: String,
    /// Target primary key column
    pub primary_key: String,
    /// Association type and join keys
    pub kind: AssociationKind,
    /// ONE or MANY
    pub cardinality: Cardinality,
}

impl From<&AssociationInclude> for JoinDescriptor {
    fn from(include: &AssociationInclude) -> Self {
        Self {
            alias: include.alias.clone(),
            table: include.target.table_name().to_string(),
            primary_key: include.target.primary_key_column().to_string(),
            kind: include.kind.clone(),
            cardinality: include.cardinality,
        }
    }
}

/// Join specification for a resource's includes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSpec {
    joins: Vec<JoinDescriptor>,
}

/// Build the join specification for a set of resolved includes
pub fn plan(includes: &[AssociationInclude]) -> JoinSpec {
    JoinSpec {
        joins: includes.iter().map(JoinDescriptor::from).collect(),
    }
}

impl JoinSpec {
    /// Join descriptors in include order
    pub fn joins(&self) -> &[JoinDescriptor] {
        &self.joins
    }

    /// Whether any included association can fan out base rows
    pub fn has_many(&self) -> bool {
        self.joins.iter().any(|j| j.cardinality == Cardinality::Many)
    }

    /// Descriptor for an alias
    pub fn find(&self, alias: &str) -> Option<&JoinDescriptor> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Whether `field` names an included association's alias
    pub fn is_alias(&self, field: &str) -> bool {
        self.find(field).is_some()
    }

    /// Group joined rows under their base record
    ///
    /// Base records keep the order in which they first appear. MANY
    /// associations become arrays of distinct rows (by target primary key),
    /// ONE associations become the matched row or `null`.
    pub fn attach(&self, primary_key: &str, rows: Vec<JoinedRow>) -> Vec<Record> {
        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for JoinedRow { base, mut joined } in rows {
            let key = base
                .get(primary_key)
                .map_or_else(String::new, Value::to_string);
            let slot = match index.get(&key) {
                Some(slot) => *slot,
                None => {
                    groups.push(Group::new(base, &self.joins));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            let group = &mut groups[slot];
            for join in &self.joins {
                if let Some(Some(record)) = joined.remove(&join.alias) {
                    if let Some(nested) = group.nested.get_mut(&join.alias) {
                        nested.push(&join.primary_key, record);
                    }
                }
            }
        }

        groups
            .into_iter()
            .map(|group| group.into_record(&self.joins))
            .collect()
    }
}

struct Group {
    base: Record,
    nested: BTreeMap<String, Nested>,
}

#[derive(Default)]
struct Nested {
    rows: Vec<Record>,
    seen: HashSet<String>,
}

impl Nested {
    fn push(&mut self, primary_key: &str, record: Record) {
        let key = record
            .get(primary_key)
            .map_or_else(|| Value::Object(record.clone()).to_string(), Value::to_string);
        if self.seen.insert(key) {
            self.rows.push(record);
        }
    }
}

impl Group {
    fn new(base: Record, joins: &[JoinDescriptor]) -> Self {
        let nested = joins
            .iter()
            .map(|j| (j.alias.clone(), Nested::default()))
            .collect();
        Self { base, nested }
    }

    fn into_record(mut self, joins: &[JoinDescriptor]) -> Record {
        for join in joins {
            let rows = self
                .nested
                .remove(&join.alias)
                .map(|n| n.rows)
                .unwrap_or_default();
            let value = match join.cardinality {
                Cardinality::Many => Value::Array(rows.into_iter().map(Value::Object).collect()),
                Cardinality::One => rows
                    .into_iter()
                    .next()
                    .map_or(Value::Null, Value::Object),
            };
            self.base.insert(join.alias.clone(), value);
        }
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeType;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn user_model() -> Model {
        let hobby = Arc::new(
            Model::new("hobby")
                .attribute("id", AttributeType::Integer)
                .attribute("name", AttributeType::Text),
        );
        let team = Arc::new(Model::new("team").attribute("id", AttributeType::Integer));
        Model::new("users")
            .attribute("id", AttributeType::Integer)
            .attribute("team_id", AttributeType::Integer)
            .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id")
            .belongs_to("team", &team, "team_id")
    }

    fn includes(model: &Model, aliases: &[&str]) -> Vec<AssociationInclude> {
        aliases
            .iter()
            .map(|a| AssociationInclude::resolve(model, &IncludeSpec::alias(*a)).unwrap())
            .collect()
    }

    #[test]
    fn test_resolve_tags_cardinality() {
        let model = user_model();
        let resolved = includes(&model, &["hobbies", "team"]);
        assert_eq!(resolved[0].cardinality, Cardinality::Many);
        assert_eq!(resolved[1].cardinality, Cardinality::One);
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let model = user_model();
        let err = AssociationInclude::resolve(&model, &IncludeSpec::alias("pets")).unwrap_err();
        assert_eq!(
            err,
            QueryError::AssociationNotFound {
                model: "users".to_string(),
                alias: "pets".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_wrong_target_model() {
        let model = user_model();
        let err =
            AssociationInclude::resolve(&model, &IncludeSpec::new("pet", "hobbies")).unwrap_err();
        assert!(matches!(err, QueryError::AssociationNotFound { .. }));
        assert!(AssociationInclude::resolve(&model, &IncludeSpec::new("hobby", "hobbies")).is_ok());
    }

    #[test]
    fn test_plan_join_descriptors() {
        let model = user_model();
        let spec = plan(&includes(&model, &["hobbies"]));
        assert!(spec.has_many());
        let join = spec.find("hobbies").unwrap();
        assert_eq!(join.table, "hobby");
        assert_eq!(join.primary_key, "id");

        let spec = plan(&includes(&model, &["team"]));
        assert!(!spec.has_many());
        assert!(plan(&[]).joins().is_empty());
    }

    #[test]
    fn test_attach_groups_many_rows() {
        let model = user_model();
        let spec = plan(&includes(&model, &["hobbies"]));
        let row = |user: i64, hobby: Option<i64>| JoinedRow {
            base: record(json!({"id": user})),
            joined: [(
                "hobbies".to_string(),
                hobby.map(|h| record(json!({"id": h}))),
            )]
            .into_iter()
            .collect(),
        };

        let rows = vec![
            row(2, Some(10)),
            row(1, Some(10)),
            row(2, Some(11)),
            row(2, Some(10)),
            row(3, None),
        ];
        let records = spec.attach("id", rows);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["id"], json!(2));
        assert_eq!(records[0]["hobbies"], json!([{"id": 10}, {"id": 11}]));
        assert_eq!(records[1]["hobbies"], json!([{"id": 10}]));
        assert_eq!(records[2]["hobbies"], json!([]));
    }

    #[test]
    fn test_attach_one_association() {
        let model = user_model();
        let spec = plan(&includes(&model, &["team"]));
        let rows = vec![
            JoinedRow {
                base: record(json!({"id": 1, "team_id": 5})),
                joined: [("team".to_string(), Some(record(json!({"id": 5}))))]
                    .into_iter()
                    .collect(),
            },
            JoinedRow {
                base: record(json!({"id": 2, "team_id": null})),
                joined: [("team".to_string(), None)].into_iter().collect(),
            },
        ];
        let records = spec.attach("id", rows);
        assert_eq!(records[0]["team"], json!({"id": 5}));
        assert_eq!(records[1]["team"], Value::Null);
    }
}
