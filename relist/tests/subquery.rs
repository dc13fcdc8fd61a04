//! End-to-end pagination over a MANY association

mod common;

use axum::http::StatusCode;
use serde_json::Value;

use common::{get, parse_range, users_resource, HOBBIES, USERS};
use relist::prelude::*;
use tower::ServiceExt;

fn hobbies_of(record: &Value) -> usize {
    record["hobbies"].as_array().map_or(0, Vec::len)
}

#[tokio::test]
async fn test_subquery_pages_base_records() {
    let (rest, users) = users_resource(&PaginationConfig::default());
    users.set_attributes(["username", "id", "email"]);
    let app = rest.router();

    let response = get(&app, "/users?count=10").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_range.as_deref(), Some("items 0-9/100"));

    let records = response.body.as_array().unwrap();
    assert_eq!(records.len(), 10);
    let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());

    // every user carries the same shared hobby rows
    let expected: Vec<i64> = (1..=HOBBIES as i64).collect();
    for record in records {
        assert_eq!(hobbies_of(record), HOBBIES);
        let hobby_ids: Vec<i64> = record["hobbies"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["id"].as_i64().unwrap())
            .collect();
        assert_eq!(hobby_ids, expected);
    }
}

#[tokio::test]
async fn test_flat_pages_joined_rows() {
    let (rest, users) = users_resource(&PaginationConfig::default());
    users.set_sub_query(false);
    let app = rest.router();

    let response = get(&app, "/users?count=10").await;

    assert_eq!(response.status, StatusCode::OK);
    // ten joined rows collapse into two users; the total counts joined rows
    assert_eq!(response.content_range.as_deref(), Some("items 0-1/500"));
    assert_ne!(response.content_range.as_deref(), Some("items 0-9/100"));

    let records = response.body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| hobbies_of(r) == HOBBIES));
}

#[tokio::test]
async fn test_flat_default_from_config() {
    let config = PaginationConfig {
        sub_query: false,
        ..PaginationConfig::default()
    };
    let (rest, _users) = users_resource(&config);

    let response = get(&rest.router(), "/users?count=10").await;
    assert_eq!(response.content_range.as_deref(), Some("items 0-1/500"));
}

#[tokio::test]
async fn test_per_request_option_overrides_resource_default() {
    let (rest, users) = users_resource(&PaginationConfig::default());
    users.list().fetch().before(|request, context| {
        if request.headers.contains_key("x-flat") {
            context.options.sub_query = Some(false);
        }
        Control::Continue
    });
    let app = rest.router();

    let flat_request = app.clone().oneshot(
        axum::http::Request::get("/users?count=10")
            .header("x-flat", "1")
            .body(axum::body::Body::empty())
            .unwrap(),
    );
    let (nested, flat) = tokio::join!(get(&app, "/users?count=10"), flat_request);

    assert_eq!(nested.content_range.as_deref(), Some("items 0-9/100"));
    assert_eq!(
        flat.unwrap().headers()[axum::http::header::CONTENT_RANGE],
        "items 0-1/500"
    );
}

#[tokio::test]
async fn test_walking_all_pages_visits_every_user_once() {
    let (rest, _users) = users_resource(&PaginationConfig::default());
    let app = rest.router();

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let response = get(&app, &format!("/users?count=7&offset={}", offset)).await;
        assert_eq!(response.status, StatusCode::OK);
        let records = response.body.as_array().unwrap();
        if records.is_empty() {
            assert_eq!(response.content_range.as_deref(), Some("items */100"));
            break;
        }

        let (start, end, total) = parse_range(response.content_range.as_deref().unwrap());
        assert_eq!(start, offset);
        assert_eq!(end - start + 1, records.len() as u64);
        assert_eq!(total, USERS as u64);

        seen.extend(records.iter().map(|r| r["id"].as_i64().unwrap()));
        offset += records.len() as u64;
    }

    assert_eq!(seen, (1..=USERS as i64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_last_partial_page() {
    let (rest, _users) = users_resource(&PaginationConfig::default());

    let response = get(&rest.router(), "/users?count=30&page=4").await;

    assert_eq!(response.content_range.as_deref(), Some("items 90-99/100"));
    assert_eq!(response.body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_sort_descending() {
    let (rest, _users) = users_resource(&PaginationConfig::default());

    let response = get(&rest.router(), "/users?count=3&sort=-id").await;

    let ids: Vec<i64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![100, 99, 98]);
    assert_eq!(response.content_range.as_deref(), Some("items 0-2/100"));
}

#[tokio::test]
async fn test_filter_narrows_total() {
    let (rest, _users) = users_resource(&PaginationConfig::default());

    let response = get(&rest.router(), "/users?id__lte=25&count=10&offset=20").await;

    assert_eq!(response.content_range.as_deref(), Some("items 20-24/25"));
    assert_eq!(response.body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_projection_keeps_includes() {
    let (rest, users) = users_resource(&PaginationConfig::default());
    users.set_attributes(["id", "username"]);

    let response = get(&rest.router(), "/users?count=1").await;

    let record = response.body[0].as_object().unwrap();
    let mut keys: Vec<&str> = record.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["hobbies", "id", "username"]);
    assert_eq!(record["hobbies"].as_array().unwrap().len(), HOBBIES);
}

#[tokio::test]
async fn test_count_clamped_to_max() {
    let config = PaginationConfig {
        max_count: 20,
        ..PaginationConfig::default()
    };
    let (rest, _users) = users_resource(&config);

    let response = get(&rest.router(), "/users?count=50").await;

    assert_eq!(response.content_range.as_deref(), Some("items 0-19/100"));
}

#[tokio::test]
async fn test_associated_filter_as_semi_join() {
    let config = PaginationConfig {
        associated_filters: AssociatedFilterPolicy::SemiJoin,
        ..PaginationConfig::default()
    };
    let (rest, _users) = users_resource(&config);
    let app = rest.router();

    let matching = get(&app, "/users?count=10&hobbies.name=hobby3").await;
    assert_eq!(matching.status, StatusCode::OK);
    assert_eq!(matching.content_range.as_deref(), Some("items 0-9/100"));

    let none = get(&app, "/users?count=10&hobbies.name=fencing").await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.content_range.as_deref(), Some("items */0"));
    assert_eq!(none.body, serde_json::json!([]));
}

#[tokio::test]
async fn test_users_without_links_have_empty_hobbies() {
    let store = MemoryStore::new();
    store
        .bulk_insert(
            "users",
            "id",
            (1..=3)
                .filter_map(|i| {
                    serde_json::json!({ "username": format!("user{}", i) })
                        .as_object()
                        .cloned()
                })
                .collect(),
        )
        .unwrap();
    store.create_table("hobby");

    let mut rest = Rest::initialize(std::sync::Arc::new(store));
    rest.resource(
        ResourceConfig::new(common::user_model())
            .endpoints(["/users", "/users/:id"])
            .include(IncludeSpec::new("hobby", "hobbies")),
    )
    .unwrap();

    let response = get(&rest.router(), "/users").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_range.as_deref(), Some("items 0-2/3"));
    for record in response.body.as_array().unwrap() {
        assert_eq!(record["hobbies"], serde_json::json!([]));
    }
}
