//! Demo service: 100 users, each linked to the same 5 hobbies, behind `/users`
//!
//! ```text
//! curl -i 'localhost:8080/users?count=10'
//! curl -i 'localhost:8080/users?count=10&subQuery=false'
//! ```

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use relist::prelude::*;
use relist::query::FilterValue;

const USERS: usize = 100;
const HOBBIES: usize = 5;

fn user_model() -> Arc<Model> {
    let hobby = Arc::new(
        Model::new("hobby")
            .attribute("id", AttributeType::Integer)
            .attribute("name", AttributeType::Text),
    );
    Arc::new(
        Model::new("users")
            .attribute("id", AttributeType::Integer)
            .attribute("username", AttributeType::Text)
            .attribute("email", AttributeType::Text)
            .belongs_to_many("hobbies", &hobby, "user_hobbies", "user_id", "hobby_id"),
    )
}

fn seed(store: &MemoryStore) -> anyhow::Result<()> {
    let users: Vec<Record> = (1..=USERS)
        .filter_map(|i| {
            json!({
                "username": format!("user{}", i),
                "email": format!("user{}@example.com", i),
            })
            .as_object()
            .cloned()
        })
        .collect();
    let users = store.bulk_insert("users", "id", users)?;

    let hobbies: Vec<Record> = (1..=HOBBIES)
        .filter_map(|h| json!({ "name": format!("hobby{}", h) }).as_object().cloned())
        .collect();
    let hobbies = store.bulk_insert("hobby", "id", hobbies)?;

    for user in &users {
        for hobby in &hobbies {
            store.link(
                "user_hobbies",
                "user_id",
                user["id"].clone(),
                "hobby_id",
                hobby["id"].clone(),
            )?;
        }
    }

    tracing::info!(
        users = USERS,
        hobbies = HOBBIES,
        "Seeded in-memory store"
    );
    Ok(())
}

#[cfg(feature = "database")]
async fn store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if let Some(database) = &config.database {
        let store = PgStore::connect(database)
            .await
            .context("connecting to PostgreSQL")?;
        return Ok(Arc::new(store));
    }
    memory_store()
}

#[cfg(not(feature = "database"))]
async fn store(_config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    memory_store()
}

fn memory_store() -> anyhow::Result<Arc<dyn Store>> {
    let store = MemoryStore::new();
    seed(&store)?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_for_service("relist-demo").context("loading configuration")?;
    init_tracing(&config)?;

    let mut rest = Rest::with_config(store(&config).await?, &config.pagination);
    let users = rest.resource(
        ResourceConfig::new(user_model())
            .endpoints(["/users", "/users/:id"])
            .include(IncludeSpec::new("hobby", "hobbies")),
    )?;
    users.set_attributes(["username", "id", "email"]);

    // `?subQuery=true|false` picks the strategy for one request
    users.list().fetch().before(|_request, context| {
        if let Some(index) = context.filters.iter().position(|f| f.field == "subQuery") {
            let option = context.filters.remove(index);
            context.options.sub_query = Some(option.value != FilterValue::from("false"));
        }
        Control::Continue
    });

    Server::new(config).serve(rest.router()).await?;
    Ok(())
}
