//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Register a fresh member and return (member id, token)
async fn register_and_login(client: &Client) -> (i64, String) {
    let email = format!("it-{}@example.org", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Integration Reader",
            "email": email,
            "password": "correct-horse"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201);
    let member: Value = response.json().await.expect("Failed to parse member");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "correct-horse" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse login response");

    (
        member["memberID"].as_i64().expect("No memberID"),
        body["token"].as_str().expect("No token in response").to_string(),
    )
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_invalid_fields() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "",
            "email": "not-an-email",
            "password": "short"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@example.org",
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_member_session() {
    let client = Client::new();
    let (member_id, token) = register_and_login(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let me: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(me["memberID"], member_id);
    assert_eq!(me["role"], "Member");
    assert!(me.get("password").is_none());

    // Own fines are readable, the desk list is not
    let response = client
        .get(format!("{}/members/{}/fines", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/fines", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_list_books_with_badges() {
    let client = Client::new();
    let (_, token) = register_and_login(&client).await;

    let response = client
        .get(format!("{}/books?perPage=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["perPage"], 5);
    for book in body["items"].as_array().expect("items") {
        assert!(book["availability"]["cssClass"].is_string());
    }
}

#[tokio::test]
#[ignore]
async fn test_unauthenticated_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_navigation_guard() {
    let client = Client::new();
    let (_, token) = register_and_login(&client).await;

    let response = client
        .post(format!("{}/navigation/authorize", BASE_URL))
        .json(&json!({ "url": "/books" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["allowed"], false);
    assert_eq!(body["redirectTo"], "/login?returnUrl=%2Fbooks");

    let response = client
        .post(format!("{}/navigation/authorize", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "url": "/books" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["allowed"], true);

    let response = client
        .post(format!("{}/navigation/authorize", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "url": "/admin" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["redirectTo"], "/");
}
