//! End-to-end conformance tests for the portfolio CRUD API.
//!
//! Each test spawns an ephemeral in-process server (real TCP, real HTTP) via
//! [`portfolio_conformance::spawn_server`] and exercises it with a `reqwest`
//! client. Records that a test needs but is not about are seeded straight
//! into storage.
//!
//! # Coverage
//!
//! | Test | Property |
//! |------|----------|
//! | `decode_yields_typed_predicate` | codec decode |
//! | `decode_rejects_malformed_keys` | codec key format |
//! | `encoding_a_record_reference_targets_its_pk` | codec encode |
//! | `list_countries_returns_every_record` | list |
//! | `get_missing_country_returns_404` | retrieve |
//! | `get_existing_country_returns_record` | retrieve |
//! | `delete_by_name_reports_count` | filtered delete |
//! | `delete_by_pk_acknowledges` | single delete |
//! | `disallowed_verb_is_400_without_storage_access` | verb gate |
//! | `put_organization_references_address` | create |
//! | `put_with_missing_required_field_is_400` | create validation |
//! | `malformed_parameter_is_400` | codec errors over HTTP |
//! | `responses_are_enveloped_and_indented` | envelope |

use std::sync::Arc;

use portfolio::models::{ADDRESS, CITY, COUNTRY, ORGANIZATION, REGION, STREET};
use portfolio::{decode_all, FieldValue, GetParameter, ParamError, ParamValue, RecordRef, Row};
use portfolio_conformance::{spawn_server, spawn_server_with, RecordingStorage};
use portfolio_server::storage::{memory::MemoryStorage, Storage};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

fn row(pairs: &[(&str, FieldValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

async fn seed_country(storage: &MemoryStorage, name: &str) -> i64 {
    storage
        .create(&COUNTRY, row(&[("name", text(name))]))
        .await
        .unwrap()
        .pk
}

/// Seed one country, region, city and street, then `n` addresses on it.
async fn seed_addresses(storage: &MemoryStorage, n: i64) {
    let country = seed_country(storage, "Canada").await;
    let region = storage
        .create(
            &REGION,
            row(&[
                ("name", text("Ontario")),
                ("region_type", text("PR")),
                ("country", FieldValue::Integer(country)),
            ]),
        )
        .await
        .unwrap()
        .pk;
    let city = storage
        .create(
            &CITY,
            row(&[("name", text("Toronto")), ("region", FieldValue::Integer(region))]),
        )
        .await
        .unwrap()
        .pk;
    let street = storage
        .create(
            &STREET,
            row(&[("name", text("King St W")), ("city", FieldValue::Integer(city))]),
        )
        .await
        .unwrap()
        .pk;
    for number in 1..=n {
        storage
            .create(
                &ADDRESS,
                row(&[
                    ("building_number", FieldValue::Integer(number * 100)),
                    ("street", FieldValue::Integer(street)),
                ]),
            )
            .await
            .unwrap();
    }
}

async fn response_body(resp: reqwest::Response) -> Value {
    let body: Value = resp.json().await.unwrap();
    body["response"].clone()
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[test]
fn decode_yields_typed_predicate() {
    let p = GetParameter::decode("age::int", "21").unwrap();
    assert_eq!(p.key_value(), ("age".to_string(), ParamValue::Int(21)));

    let predicates = decode_all([("name::str", "Canada"), ("active::bool", "2")]).unwrap();
    assert_eq!(predicates["name"], ParamValue::Str("Canada".into()));
    assert_eq!(predicates["active"], ParamValue::Bool(true));
}

#[test]
fn decode_rejects_malformed_keys() {
    for key in ["age", "age::", "::int", "age::int::x", "age::number"] {
        assert!(
            matches!(GetParameter::decode(key, "1"), Err(ParamError::InvalidKey(_))),
            "{key} should be rejected"
        );
    }
}

#[test]
fn encoding_a_record_reference_targets_its_pk() {
    let p = GetParameter::new("hq_address", ParamValue::RecordRef(RecordRef { pk: 3 }));
    assert_eq!(
        p.encode(),
        ("hq_address__pk::fk".to_string(), "3".to_string())
    );
}

// ---------------------------------------------------------------------------
// CRUD over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_countries_returns_every_record() {
    let (base, storage) = spawn_server().await;
    for name in ["Canada", "Mexico", "Peru"] {
        seed_country(&storage, name).await;
    }

    let resp = make_client()
        .get(format!("{base}/crud/country/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        response_body(resp).await,
        json!([
            { "pk": 1, "name": "Canada" },
            { "pk": 2, "name": "Mexico" },
            { "pk": 3, "name": "Peru" }
        ])
    );
}

#[tokio::test]
async fn get_missing_country_returns_404() {
    let (base, _storage) = spawn_server().await;
    let resp = make_client()
        .get(format!("{base}/crud/country/5/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(response_body(resp).await["code"], "not_found");
}

#[tokio::test]
async fn get_existing_country_returns_record() {
    let (base, storage) = spawn_server().await;
    let pk = seed_country(&storage, "Chile").await;

    let resp = make_client()
        .get(format!("{base}/crud/country/{pk}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(response_body(resp).await, json!({ "pk": pk, "name": "Chile" }));
}

#[tokio::test]
async fn delete_by_name_reports_count() {
    let (base, storage) = spawn_server().await;
    for name in ["Canada", "Mexico", "Canada"] {
        seed_country(&storage, name).await;
    }

    let resp = make_client()
        .delete(format!("{base}/crud/country/"))
        .query(&[("name::str", "Canada")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        response_body(resp).await,
        json!({ "deleted": true, "number_entries_affected": 2 })
    );

    let left = storage.filter(&COUNTRY, &[]).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].get("name"), Some(&text("Mexico")));
}

#[tokio::test]
async fn delete_by_pk_acknowledges() {
    let (base, storage) = spawn_server().await;
    let pk = seed_country(&storage, "Canada").await;
    let client = make_client();

    let resp = client
        .delete(format!("{base}/crud/country/{pk}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(response_body(resp).await, json!({ "deleted": true }));
    assert!(storage.get(&COUNTRY, pk).await.unwrap().is_none());

    let resp = client
        .delete(format!("{base}/crud/country/{pk}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn disallowed_verb_is_400_without_storage_access() {
    let storage = Arc::new(RecordingStorage::default());
    let base = spawn_server_with(Arc::clone(&storage) as Arc<dyn Storage>).await;

    let resp = make_client()
        .post(format!("{base}/crud/region/"))
        .form(&[("name::str", "Ontario")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body = response_body(resp).await;
    assert_eq!(body["code"], "method_not_allowed");
    assert!(body["error"].as_str().unwrap().contains("POST"));
    assert_eq!(storage.calls(), 0);
}

#[tokio::test]
async fn put_organization_references_address() {
    let (base, storage) = spawn_server().await;
    seed_addresses(&storage, 3).await;

    let resp = make_client()
        .put(format!("{base}/crud/organization/"))
        .form(&[("name::str", "Acme"), ("hq_address::fk", "3")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created = response_body(resp).await;
    assert_eq!(created["name"], "Acme");
    assert_eq!(created["hq_address"], 3);
    let pk = created["pk"].as_i64().unwrap();
    assert!(pk > 0);

    let orgs = storage.filter(&ORGANIZATION, &[]).await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].pk, pk);
    assert_eq!(orgs[0].get("hq_address"), Some(&FieldValue::Integer(3)));
}

#[tokio::test]
async fn put_with_missing_required_field_is_400() {
    let (base, storage) = spawn_server().await;

    let resp = make_client()
        .put(format!("{base}/crud/organization/"))
        .form(&[("name::str", "Acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(response_body(resp).await["code"], "validation_failed");
    assert!(storage.filter(&ORGANIZATION, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_parameter_is_400() {
    let (base, _storage) = spawn_server().await;

    let resp = make_client()
        .get(format!("{base}/crud/address/"))
        .query(&[("building_number::int", "ten")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(response_body(resp).await["code"], "invalid_parameter");
}

#[tokio::test]
async fn responses_are_enveloped_and_indented() {
    let (base, storage) = spawn_server().await;
    seed_country(&storage, "Canada").await;

    let resp = make_client()
        .get(format!("{base}/crud/country/1/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["content-type"], "application/json");
    let text = resp.text().await.unwrap();
    assert!(text.starts_with("{\n    \"response\": {\n        \""), "{text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({ "response": { "pk": 1, "name": "Canada" } }));
}
