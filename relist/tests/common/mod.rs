#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use relist::prelude::*;

pub const USERS: usize = 100;
pub const HOBBIES: usize = 5;

pub fn hobby_model() -> Arc<Model> {
    Arc::new(
        Model::new("hobby")
            .attribute("id", AttributeType::Integer)
            .attribute("name", AttributeType::Text),
    )
}

pub fn user_model() -> Arc<Model> {
    Arc::new(
        Model::new("users")
            .attribute("id", AttributeType::Integer)
            .attribute("username", AttributeType::Text)
            .attribute("email", AttributeType::Text)
            .belongs_to_many("hobbies", &hobby_model(), "user_hobbies", "user_id", "hobby_id"),
    )
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

/// `USERS` users, each linked to all `HOBBIES` hobbies
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let users = store
        .bulk_insert(
            "users",
            "id",
            (1..=USERS)
                .map(|i| {
                    record(json!({
                        "username": format!("user{}", i),
                        "email": format!("user{}@example.com", i),
                    }))
                })
                .collect(),
        )
        .unwrap();
    let hobbies = store
        .bulk_insert(
            "hobby",
            "id",
            (1..=HOBBIES)
                .map(|h| record(json!({ "name": format!("hobby{}", h) })))
                .collect(),
        )
        .unwrap();

    for user in &users {
        for hobby in &hobbies {
            store
                .link("user_hobbies", "user_id", user["id"].clone(), "hobby_id", hobby["id"].clone())
                .unwrap();
        }
    }
    Arc::new(store)
}

/// Rest registry over the seeded store with a `/users` resource including hobbies
pub fn users_resource(pagination: &PaginationConfig) -> (Rest, ResourceHandle) {
    let mut rest = Rest::with_config(seeded_store(), pagination);
    let users = rest
        .resource(
            ResourceConfig::new(user_model())
                .endpoints(["/users", "/users/:id"])
                .include(IncludeSpec::new("hobby", "hobbies")),
        )
        .unwrap();
    (rest, users)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_range: Option<String>,
    pub body: Value,
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_range = response
        .headers()
        .get(header::CONTENT_RANGE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse {
        status,
        content_range,
        body,
    }
}

/// Parse `items {start}-{end}/{total}`
pub fn parse_range(header: &str) -> (u64, u64, u64) {
    let range = header.strip_prefix("items ").unwrap();
    let (bounds, total) = range.split_once('/').unwrap();
    let (start, end) = bounds.split_once('-').unwrap();
    (
        start.parse().unwrap(),
        end.parse().unwrap(),
        total.parse().unwrap(),
    )
}
