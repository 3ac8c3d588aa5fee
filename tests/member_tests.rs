mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::TestApp;
use http_body_util::BodyExt;
use memberdesk::entities::members;
use sea_orm::EntityTrait;
use serde_json::{Value, json};

async fn create_member(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, body) = app
        .request("POST", "/api/members", Some(token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["data"].clone()
}

fn bob() -> Value {
    json!({
        "username": "bob",
        "email": "bob@example.com",
        "password": "hunter22",
        "image": "https://img.example.com/bob.png",
    })
}

#[tokio::test]
async fn test_create_member() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;

    let member = create_member(&app, &token, bob()).await;
    assert_eq!(member["username"], "bob");
    assert_eq!(member["email"], "bob@example.com");
    assert_eq!(member["image"], "https://img.example.com/bob.png");
    assert!(member["id"].is_string());
    assert!(member.get("password").is_none());
    assert!(member.get("password_hash").is_none());

    let mails = app.mails_to("bob@example.com", 1).await;
    assert_eq!(mails.len(), 1);
    assert!(mails[0].subject.contains("created"));
    assert!(!mails[0].body.contains("hunter22"));
}

#[tokio::test]
async fn test_create_member_validation() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;

    let (status, body) = app
        .request(
            "POST",
            "/api/members",
            Some(&token),
            Some(json!({ "username": "", "email": "nope", "password": "123" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["username"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());

    let (status, body) = app.request("GET", "/api/members", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_member_duplicate_email() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    create_member(&app, &token, bob()).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/members",
            Some(&token),
            Some(json!({ "username": "bob2", "email": "bob@example.com", "password": "hunter22" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "The email has already been taken.");
}

#[tokio::test]
async fn test_list_and_get_members() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;

    let first = create_member(&app, &token, bob()).await;
    create_member(
        &app,
        &token,
        json!({ "username": "carol", "email": "carol@example.com", "password": "hunter22" }),
    )
    .await;

    let (status, body) = app.request("GET", "/api/members", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["username"], "bob");
    assert_eq!(list[1]["username"], "carol");
    assert!(list[1]["image"].is_null());

    let id = first["id"].as_str().unwrap();
    let (status, body) = app
        .request("GET", &format!("/api/members/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "bob@example.com");
}

#[tokio::test]
async fn test_get_unknown_member() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;

    let (status, _) = app
        .request(
            "GET",
            "/api/members/6f1c2a51-3b7e-4d3c-9a55-2f4e5d6c7b8a",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("GET", "/api/members/not-a-uuid", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_update_only_touches_supplied_fields() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "username": "robert" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "robert");
    assert_eq!(body["data"]["email"], "bob@example.com");
    assert_eq!(body["data"]["image"], "https://img.example.com/bob.png");

    let mails = app.mails_to("bob@example.com", 2).await;
    assert_eq!(mails.len(), 2);
    let update_mail = &mails[1];
    assert!(update_mail.body.contains("- Username: robert"));
    assert!(!update_mail.body.contains("Password"));
    assert!(!update_mail.body.contains("- Email:"));
}

#[tokio::test]
async fn test_email_only_update_keeps_other_fields() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let before = members::Entity::find_by_id(id.to_string())
        .one(&app.state.store().conn)
        .await
        .unwrap()
        .unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "email": "robert@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "robert@example.com");

    let after = members::Entity::find_by_id(id.to_string())
        .one(&app.state.store().conn)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.email, "robert@example.com");
    assert_eq!(after.username, before.username);
    assert_eq!(after.image, before.image);
    assert_eq!(after.password_hash, before.password_hash);
}

#[tokio::test]
async fn test_update_validates_supplied_fields() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "email": "broken", "password": "123" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
    assert!(body["errors"].get("username").is_none());
}

#[tokio::test]
async fn test_update_email_uniqueness() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    create_member(
        &app,
        &token,
        json!({ "username": "carol", "email": "carol@example.com", "password": "hunter22" }),
    )
    .await;
    let id = member["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "email": "carol@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "The email has already been taken.");

    // Re-submitting the current address is not a conflict
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "email": "bob@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_rehashes_password_and_clears_image() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let before = members::Entity::find_by_id(id.to_string())
        .one(&app.state.store().conn)
        .await
        .unwrap()
        .unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/members/{id}"),
            Some(&token),
            Some(json!({ "password": "newsecret", "image": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["image"].is_null());

    let after = members::Entity::find_by_id(id.to_string())
        .one(&app.state.store().conn)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(before.password_hash, after.password_hash);
    assert!(after.password_hash.starts_with("$argon2id$"));
    assert!(memberdesk::security::verify_secret("newsecret", &after.password_hash).unwrap());

    let mails = app.mails_to("bob@example.com", 2).await;
    assert!(mails[1].body.contains("- Password: changed"));
    assert!(mails[1].body.contains("- Profile image: updated"));
}

#[tokio::test]
async fn test_update_unknown_member() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;

    let (status, _) = app
        .request(
            "PUT",
            "/api/members/6f1c2a51-3b7e-4d3c-9a55-2f4e5d6c7b8a",
            Some(&token),
            Some(json!({ "username": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_member() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let (status, _) = app
        .request("DELETE", &format!("/api/members/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", &format!("/api/members/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("DELETE", &format!("/api/members/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mails = app.mails_to("bob@example.com", 2).await;
    assert_eq!(mails.len(), 2);
    assert!(mails[1].subject.contains("deleted"));
}

#[tokio::test]
async fn test_deleted_email_can_be_reused() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(&app, &token, bob()).await;
    let id = member["id"].as_str().unwrap();

    let (status, body) = app
        .request("POST", "/api/members", Some(&token), Some(bob()))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "The email has already been taken.");

    let (status, _) = app
        .request("DELETE", &format!("/api/members/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let recreated = create_member(&app, &token, bob()).await;
    assert_eq!(recreated["email"], "bob@example.com");
    assert_ne!(recreated["id"], member["id"]);
}

#[tokio::test]
async fn test_export_csv() {
    let app = TestApp::spawn().await;
    let token = app.authenticated().await;
    let member = create_member(
        &app,
        &token,
        json!({
            "username": "Doe, Jane",
            "email": "jane@example.com",
            "password": "hunter22",
        }),
    )
    .await;

    let response = app
        .raw(
            Request::builder()
                .uri("/api/members/export/csv")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"members_export_"));
    assert!(disposition.ends_with(".csv\""));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("ID,Username,Email,Image"));
    assert_eq!(
        lines.next().unwrap(),
        format!("{},\"Doe, Jane\",jane@example.com,", member["id"].as_str().unwrap())
    );
    assert_eq!(lines.next(), None);
}
