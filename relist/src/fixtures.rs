//! Shared models and seeded stores for unit tests

use std::sync::Arc;

use serde_json::json;

use crate::config::PaginationConfig;
use crate::model::{AttributeType, Model, Record};
use crate::query::IncludeSpec;
use crate::resource::{ResourceConfig, ResourceDefinition};
use crate::store::MemoryStore;

pub(crate) fn hobby_model() -> Arc<Model> {
    Arc::new(
        Model::new("hobby")
            .attribute("id", AttributeType::Integer)
            .attribute("name", AttributeType::Text),
    )
}

pub(crate) fn team_model() -> Arc<Model> {
    Arc::new(
        Model::new("team")
            .attribute("id", AttributeType::Integer)
            .attribute("name", AttributeType::Text),
    )
}

pub(crate) fn users_model() -> Arc<Model> {
    Arc::new(
        Model::new("users")
            .attribute("id", AttributeType::Integer)
            .attribute("username", AttributeType::Text)
            .attribute("email", AttributeType::Text)
            .attribute("team_id", AttributeType::Integer)
            .belongs_to_many("hobbies", &hobby_model(), "user_hobbies", "user_id", "hobby_id")
            .belongs_to("team", &team_model(), "team_id"),
    )
}

fn resolve(config: ResourceConfig) -> ResourceDefinition {
    ResourceDefinition::resolve(config, &PaginationConfig::default()).unwrap()
}

/// Users including their hobbies (MANY)
pub(crate) fn users_definition(sub_query: bool) -> ResourceDefinition {
    resolve(
        ResourceConfig::new(users_model())
            .include(IncludeSpec::new("hobby", "hobbies"))
            .sub_query(sub_query),
    )
}

/// Users including only their team (ONE)
pub(crate) fn users_with_team_definition() -> ResourceDefinition {
    resolve(ResourceConfig::new(users_model()).include(IncludeSpec::new("team", "team")))
}

/// `users` rows, each linked to the same `hobbies` shared hobby rows
pub(crate) fn seeded_store(users: usize, hobbies: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table("team");

    let records: Vec<Record> = (1..=users)
        .filter_map(|i| {
            json!({
                "username": format!("user{}", i),
                "email": format!("user{}@example.com", i),
                "team_id": null,
            })
            .as_object()
            .cloned()
        })
        .collect();
    let users = store.bulk_insert("users", "id", records).unwrap();

    let hobbies: Vec<Record> = (1..=hobbies)
        .filter_map(|h| json!({ "name": format!("hobby{}", h) }).as_object().cloned())
        .collect();
    let hobbies = store.bulk_insert("hobby", "id", hobbies).unwrap();

    for user in &users {
        for hobby in &hobbies {
            store
                .link("user_hobbies", "user_id", user["id"].clone(), "hobby_id", hobby["id"].clone())
                .unwrap();
        }
    }
    store
}
