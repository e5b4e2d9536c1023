/// Integration tests for the Taskify API
///
/// These tests drive the full router against PostgreSQL:
/// - Scoped listing and the read/modify visibility rules
/// - Admin management and the last-admin guard
/// - Activity logging of mutations
/// - Tag lifecycle and dashboard statistics
///
/// Run with: DATABASE_URL=postgresql://... cargo test -p taskify-api --test api_tests

mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, unique, TestContext, PASSWORD};
use serde_json::json;
use taskify_shared::models::activity_log::ActivityLogEntry;
use taskify_shared::models::user::{Role, User};
use uuid::Uuid;

fn ids(body: &serde_json::Value) -> Vec<Uuid> {
    body.as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect()
}

#[tokio::test]
async fn test_project_listing_is_scoped_to_owner() {
    let Some(ctx) = TestContext::new().await else { return };
    let alice = ctx.user(Role::User).await;
    let bob = ctx.user(Role::User).await;
    let admin = ctx.user(Role::Admin).await;

    let alice_project = ctx.create_project(&alice, &unique("alice")).await;
    let bob_project = ctx.create_project(&bob, &unique("bob")).await;

    let (status, body) = ctx.get("/api/projects", &alice).await;
    assert_eq!(status, StatusCode::OK);
    let visible = ids(&body);
    assert!(visible.contains(&alice_project));
    assert!(!visible.contains(&bob_project));

    let (_, body) = ctx.get("/api/projects", &admin).await;
    let visible = ids(&body);
    assert!(visible.contains(&alice_project));
    assert!(visible.contains(&bob_project));

    let (status, _) = ctx.get(&format!("/api/projects/{}", bob_project), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_task_hidden_on_read_forbidden_on_update() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.user(Role::User).await;
    let stranger = ctx.user(Role::User).await;

    let task = ctx.create_task(&owner, json!({ "title": "Private" })).await;
    let uri = format!("/api/tasks/{}", task);

    let (status, _) = ctx.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.get(&uri, &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = ctx.put(&uri, &stranger, json!({ "title": "Mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // Only admins delete tasks, even their own
    let (status, _) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_assignee_sees_task_and_partial_update_keeps_other_fields() {
    let Some(ctx) = TestContext::new().await else { return };
    let creator = ctx.user(Role::User).await;
    let assignee = ctx.user(Role::User).await;

    let task = ctx
        .create_task(
            &creator,
            json!({
                "title": "Review",
                "description": "Read the draft",
                "priority": "high",
                "assignedToUserId": assignee.id,
            }),
        )
        .await;
    let uri = format!("/api/tasks/{}", task);

    let (status, _) = ctx.put(&uri, &assignee, json!({ "status": "done", "description": null })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx.get(&uri, &assignee).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Done");
    assert_eq!(body["priority"], "High");
    assert_eq!(body["title"], "Review");
    assert!(body["description"].is_null());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_task_with_hidden_project_is_a_validation_error() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.user(Role::User).await;
    let other = ctx.user(Role::User).await;
    let project = ctx.create_project(&owner, &unique("hidden")).await;

    let (status, body) = ctx
        .post("/api/tasks", &other, json!({ "title": "Sneak in", "projectId": project }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "projectId");

    let (status, body) = ctx
        .post("/api/tasks", &other, json!({ "title": "Nowhere", "projectId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "projectId");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_second_admin_can_be_deleted() {
    let Some(ctx) = TestContext::new().await else { return };
    let first = ctx.user(Role::Admin).await;
    let second = ctx.user(Role::Admin).await;
    let regular = ctx.user(Role::User).await;

    let (status, _) = ctx.delete(&format!("/api/auth/users/{}", first.id), &regular).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&format!("/api/auth/users/{}", second.id), &first).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(User::find_by_id(&ctx.db, second.id).await.unwrap().is_none());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_user_with_tasks_cannot_be_deleted() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.user(Role::Admin).await;
    let worker = ctx.user(Role::User).await;
    ctx.create_task(&worker, json!({ "title": "Keep me" })).await;

    let (status, body) = ctx.delete(&format!("/api/auth/users/{}", worker.id), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_role_change_requires_admin() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.user(Role::User).await;
    let uri = format!("/api/auth/users/{}", user.id);
    let username = unique("self");

    let (status, _) = ctx
        .put(&uri, &user, json!({ "username": username, "email": user.email, "role": "Admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .put(&uri, &user, json!({ "username": username, "email": user.email }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let stored = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, username);
    assert_eq!(stored.role, Role::User);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_email_in_any_case_conflicts() {
    let Some(ctx) = TestContext::new().await else { return };
    let local = unique("dup");
    let email = format!("{}@Example.com", local.to_uppercase());

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "duplicate", "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["message"].is_string());

    let registered = User::find_by_email(&ctx.db, &email).await.unwrap().unwrap();
    ctx.track_user(registered.id);
    assert_eq!(registered.role, Role::User);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "duplicate",
                "email": email.to_lowercase(),
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already exists");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_mutations_produce_exactly_one_activity_entry() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.user(Role::User).await;

    let project = ctx.create_project(&user, &unique("audited")).await;
    let entries = ActivityLogEntry::list_for_entity(&ctx.db, "Project", project)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "Create");
    assert_eq!(entries[0].user_id, user.id);

    let task = ctx.create_task(&user, json!({ "title": "Audit me" })).await;
    let (status, _) = ctx
        .put(&format!("/api/tasks/{}", task), &user, json!({ "priority": "Low" }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let updates: Vec<_> = ActivityLogEntry::list_for_entity(&ctx.db, "Task", task)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.action == "Update")
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].user_id, user.id);

    let (status, body) = ctx.post("/api/tags", &user, json!({ "name": unique("audit") })).await;
    assert_eq!(status, StatusCode::CREATED);
    let tag = id_of(&body);
    let (status, _) = ctx.delete(&format!("/api/tags/{}", tag), &user).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let deletes: Vec<_> = ActivityLogEntry::list_for_entity(&ctx.db, "Tag", tag)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.action == "Delete")
        .collect();
    assert_eq!(deletes.len(), 1);

    // Failed requests leave no trace
    let stranger = ctx.user(Role::User).await;
    let (status, _) = ctx
        .put(&format!("/api/tasks/{}", task), &stranger, json!({ "priority": "High" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let by_stranger = ActivityLogEntry::list_for_user(&ctx.db, stranger.id, 10)
        .await
        .unwrap();
    assert!(by_stranger.is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_referenced_tag_cannot_be_deleted() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.user(Role::User).await;

    let (_, body) = ctx.post("/api/tags", &user, json!({ "name": unique("busy") })).await;
    let tag = id_of(&body);
    let task = ctx.create_task(&user, json!({ "title": "Tagged" })).await;
    let tags_uri = format!("/api/tasks/{}/tags", task);

    let (status, body) = ctx.post(&tags_uri, &user, json!({ "tagIds": [tag, tag] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);

    let (status, _) = ctx.delete(&format!("/api/tags/{}", tag), &user).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx.post(&tags_uri, &user, json!({ "tagIds": [] })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tags"].as_array().unwrap().is_empty());

    let (status, _) = ctx.delete(&format!("/api/tags/{}", tag), &user).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx
        .post(&tags_uri, &user, json!({ "tagIds": [Uuid::new_v4()] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "tagIds");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_attachments_roundtrip() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.user(Role::User).await;
    let task = ctx.create_task(&user, json!({ "title": "With files" })).await;
    let uri = format!("/api/tasks/{}/attachments", task);

    let (status, body) = ctx
        .post(&uri, &user, json!({ "fileName": "brief.pdf", "filePath": "/files/brief.pdf" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["taskId"], task.to_string());

    let (status, body) = ctx.get(&uri, &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["fileName"], "brief.pdf");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_register_login_and_overview_stats() {
    let Some(ctx) = TestContext::new().await else { return };
    let email = format!("{}@example.com", unique("flow"));

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "flow-user", "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expiresAt"].is_string());
    let user_id = id_of(&body["user"]);
    ctx.track_user(user_id);
    let user = common::TestUser {
        id: user_id,
        email: email.clone(),
        token: body["token"].as_str().unwrap().to_string(),
    };

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "Wrong123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let project = ctx.create_project(&user, &unique("stats")).await;
    let task = ctx
        .create_task(&user, json!({ "title": "Count me", "projectId": project }))
        .await;
    let tag_name = unique("urgent");
    let (_, body) = ctx.post("/api/tags", &user, json!({ "name": tag_name })).await;
    let tag = id_of(&body);
    let (status, _) = ctx
        .post(&format!("/api/tasks/{}/tags", task), &user, json!({ "tagIds": [tag] }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.get("/api/stats/overview", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalTasks"], 1);
    assert_eq!(body["pendingTasks"], 1);
    assert_eq!(body["completionRate"], 0.0);
    assert_eq!(body["tasksByStatus"], json!({ "Todo": 1 }));
    assert_eq!(body["tasksByPriority"], json!({ "Normal": 1 }));
    assert_eq!(body["mostUsedTag"], tag_name);
    assert_eq!(body["totalProjects"], 1);
    assert_eq!(body["activeProjects"], 1);

    let (status, body) = ctx.get(&format!("/api/stats/project/{}", project), &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projectId"], project.to_string());
    assert_eq!(body["totalTasks"], 1);
    assert!(body["lastTaskCreated"].is_string());

    let stranger = ctx.user(Role::User).await;
    let (status, _) = ctx.get(&format!("/api/stats/project/{}", project), &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unlink so the tag can be removed with the test data
    ctx.post(&format!("/api/tasks/{}/tags", task), &user, json!({ "tagIds": [] }))
        .await;
    ctx.delete(&format!("/api/tags/{}", tag), &user).await;
    ctx.cleanup().await;
}
