//! Contact form API integration tests.
//!
//! Run with: `cargo test -p entrant-api --test contact_test`

mod helpers;

use entrant_api::repository::ContactRepository as _;
use helpers::{api_path, contact_body, setup_test_app};

#[tokio::test]
async fn test_submit_contact() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/contact"))
        .json(&contact_body("Grace@Example.COM"))
        .await;

    assert_eq!(response.status_code(), 201, "body: {}", response.text());
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Contact form submitted successfully! We will respond soon."
    );
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert_eq!(body["data"]["subject"], "submission-help");
    assert!(body["data"]["id"].is_string());
    assert!(body["data"]["createdAt"].is_string());
    // The echo omits the message body and age
    assert!(body["data"].get("message").is_none());

    assert_eq!(app.contacts.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_submit_contact_validation_errors() {
    let app = setup_test_app().await;

    let mut body = contact_body("grace@example.com");
    body["age"] = serde_json::json!(21);
    let response = app.client().post(&api_path("/contact")).json(&body).await;
    assert_eq!(response.status_code(), 400);
    let json: serde_json::Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INVALID_INPUT");

    let mut body = contact_body("grace@example.com");
    body["subject"] = serde_json::json!("refunds");
    let response = app.client().post(&api_path("/contact")).json(&body).await;
    assert_eq!(response.status_code(), 400);

    let mut body = contact_body("grace@example.com");
    body["message"] = serde_json::json!("hi");
    let response = app.client().post(&api_path("/contact")).json(&body).await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(app.contacts.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_submit_contact_rejects_non_json_body() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/contact"))
        .text("name=Grace")
        .await;

    assert_eq!(response.status_code(), 400);
    let json: serde_json::Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_list_contacts_newest_first() {
    let app = setup_test_app().await;
    for email in ["first@example.com", "second@example.com", "third@example.com"] {
        let response = app
            .client()
            .post(&api_path("/contact"))
            .json(&contact_body(email))
            .await;
        assert_eq!(response.status_code(), 201);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = app
        .client()
        .get(&api_path("/contact?page=1&limit=2"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["email"], "third@example.com");
    assert_eq!(body["data"][1]["email"], "second@example.com");
    assert_eq!(body["data"][0]["age"], "12");
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);
}
