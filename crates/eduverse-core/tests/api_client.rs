use std::error::Error;
use std::time::Duration;

use eduverse_core::models::NewNote;
use eduverse_core::session::{TOKEN_KEY, USER_KEY};
use eduverse_core::{
    AiReply, ApiError, KeyValueStore, MemoryStore, Note, NoteKind, NoteSync, Session, SyncOutcome,
};
use serde_json::json;

use crate::common::{Canned, CannedServer};

mod common;

fn note_json(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "content": "F = ma",
        "note_type": "text",
        "is_public": false,
        "user_id": 1,
        "created_at": "2024-03-01T10:15:30.123456",
        "updated_at": null
    })
}

#[tokio::test]
async fn login_stores_token_and_profile() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![
        Canned::json(200, json!({"access_token": "tok-123", "token_type": "bearer"})),
        Canned::json(
            200,
            json!({"id": 1, "email": "ayse@example.com", "username": "ayse", "is_active": true}),
        ),
    ])
    .await;
    let store = MemoryStore::new();

    let session = Session::login(&server.client(), &store, "ayse", "secret").await?;

    assert_eq!(session.client().token(), Some("tok-123"));
    assert_eq!(session.user().map(|u| u.username.as_str()), Some("ayse"));
    assert_eq!(store.get(TOKEN_KEY).await?.as_deref(), Some("tok-123"));
    assert!(store.get(USER_KEY).await?.is_some());

    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/v1/auth/login");
    assert!(requests[0]
        .header("content-type")
        .is_some_and(|v| v.starts_with("multipart/form-data")));
    assert!(requests[0].header("authorization").is_none());
    let form = requests[0].body_text();
    assert!(form.contains("name=\"username\""));
    assert!(form.contains("ayse"));

    assert_eq!(requests[1].path, "/api/v1/auth/me");
    assert_eq!(requests[1].header("authorization"), Some("Bearer tok-123"));
    Ok(())
}

#[tokio::test]
async fn login_survives_profile_failure() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![
        Canned::json(200, json!({"access_token": "tok"})),
        Canned::json(500, json!({"detail": "boom"})),
    ])
    .await;
    let store = MemoryStore::new();

    let session = Session::login(&server.client(), &store, "ayse", "secret").await?;

    assert!(session.user().is_none());
    assert_eq!(store.get(TOKEN_KEY).await?.as_deref(), Some("tok"));
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let server = CannedServer::start(vec![Canned::json(
        401,
        json!({"detail": "Incorrect username or password"}),
    )])
    .await;
    let store = MemoryStore::new();

    let err = Session::login(&server.client(), &store, "ayse", "wrong")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "not authorized: Incorrect username or password"
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn list_notes_sends_bearer_and_reads_naive_timestamps() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(
        200,
        json!([note_json(1, "Physics"), note_json(2, "Chemistry")]),
    )])
    .await;

    let notes = server.client().with_token("abc").list_notes().await?;

    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].title, "Physics");
    assert!(notes[0].is_published());
    assert_eq!(
        notes[0].created_at.map(|t| t.to_rfc3339()),
        Some("2024-03-01T10:15:30.123456+00:00".to_string())
    );
    assert!(notes[0].updated_at.is_none());

    let requests = server.requests();
    assert_eq!(requests[0].path, "/api/v1/notes/");
    assert_eq!(requests[0].header("authorization"), Some("Bearer abc"));
    Ok(())
}

#[tokio::test]
async fn list_notes_by_kind_filters_on_query() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(200, json!([]))]).await;

    let notes = server
        .client()
        .list_notes_by_kind(NoteKind::Drawing)
        .await?;

    assert!(notes.is_empty());
    assert_eq!(server.requests()[0].path, "/api/v1/notes/?note_type=drawing");
    Ok(())
}

#[tokio::test]
async fn create_note_posts_wire_fields() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(200, note_json(7, "Physics"))]).await;
    let note = Note::text("Physics", "F = ma");

    let created = server.client().create_note(&NewNote::from(&note)).await?;
    assert_eq!(created.id, Some(7));

    let body = server.requests()[0].json();
    assert_eq!(
        body,
        json!({"title": "Physics", "content": "F = ma", "note_type": "text", "is_public": false})
    );
    Ok(())
}

#[tokio::test]
async fn not_found_carries_detail() {
    let server =
        CannedServer::start(vec![Canned::json(404, json!({"detail": "Note not found"}))]).await;

    let err = server.client().get_note(99).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound { ref detail } if detail == "Note not found"));
    assert_eq!(server.requests()[0].path, "/api/v1/notes/99");
}

#[tokio::test]
async fn delete_accepts_empty_204() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::empty(204)]).await;

    server.client().delete_note(3).await?;

    let requests = server.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/api/v1/notes/3");
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = CannedServer::start(vec![Canned::raw(200, "<html>proxy</html>")]).await;

    let err = server.client().list_notes().await.unwrap_err();

    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = CannedServer::silent().await;
    let client = server.client_with_timeout(Duration::from_millis(200));

    let err = client.list_notes().await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout { .. }), "got {:?}", err);
}

#[tokio::test]
async fn ai_chat_decodes_completion() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(
        200,
        json!({"choices": [{"message": {"role": "assistant", "content": "Newton's second law"}}]}),
    )])
    .await;

    let reply = server
        .client()
        .ai_chat("What is F = ma?", "mistralai/mistral-7b-instruct", 0.7)
        .await?;

    assert_eq!(reply, AiReply::ChatCompletion("Newton's second law".to_string()));
    let request = &server.requests()[0];
    assert_eq!(request.path, "/api/v1/ai/chat");
    let body = request.json();
    assert_eq!(body["message"], "What is F = ma?");
    assert_eq!(body["model"], "mistralai/mistral-7b-instruct");
    assert!(body.get("topic").is_none());
    Ok(())
}

#[tokio::test]
async fn ai_solve_math_reads_solution_field() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(200, json!({"solution": "x = 4"}))]).await;

    let reply = server
        .client()
        .ai_solve_math("2x = 8", "mistralai/mistral-7b-instruct", 0.2)
        .await?;

    assert_eq!(reply.text(), "x = 4");
    assert_eq!(server.requests()[0].json()["problem"], "2x = 8");
    Ok(())
}

#[tokio::test]
async fn upload_file_sends_multipart_parts() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(
        201,
        json!({
            "id": 5,
            "filename": "abc.m4a",
            "original_filename": "lecture.m4a",
            "file_size": 4,
            "mime_type": "audio/m4a",
            "file_type": "audio",
            "note_id": 2,
            "user_id": 1,
            "file_path": "uploads/abc.m4a"
        }),
    )])
    .await;

    let file = server
        .client()
        .upload_file("lecture.m4a", b"RIFF".to_vec(), Some(2))
        .await?;

    assert_eq!(file.id, 5);
    let request = &server.requests()[0];
    assert_eq!(request.path, "/api/v1/files/upload");
    let body = request.body_text();
    assert!(body.contains("name=\"file\"; filename=\"lecture.m4a\""));
    assert!(body.contains("name=\"note_id\""));
    Ok(())
}

#[tokio::test]
async fn download_file_returns_bytes() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::raw(200, "binary-ish")]).await;

    let bytes = server.client().download_file(5).await?;

    assert_eq!(bytes, b"binary-ish");
    assert_eq!(server.requests()[0].path, "/api/v1/files/download/5");
    Ok(())
}

#[tokio::test]
async fn list_all_degrades_when_server_fails() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(500, json!({"detail": "db down"}))]).await;
    let sync = NoteSync::new(MemoryStore::new(), server.client(), "@eduverse_drafts");
    sync.save_draft(&Note::text("offline draft", "")).await?;

    let listing = sync.list_all().await?;

    assert_eq!(listing.entries.len(), 1);
    assert!(listing.entries[0].is_draft());
    Ok(())
}

#[tokio::test]
async fn sync_drafts_publishes_over_http() -> Result<(), Box<dyn Error>> {
    let server = CannedServer::start(vec![Canned::json(200, note_json(11, "Physics"))]).await;
    let sync = NoteSync::new(
        MemoryStore::new(),
        server.client().with_token("abc"),
        "@eduverse_drafts",
    );
    sync.save_draft(&Note::text("Physics", "F = ma")).await?;

    let reports = sync.sync_drafts().await?;

    assert_eq!(reports.len(), 1);
    assert!(matches!(
        &reports[0].outcome,
        SyncOutcome::Published { note } if note.id == Some(11)
    ));
    assert!(sync.list_drafts().await?.drafts.is_empty());

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/v1/notes/");
    assert_eq!(request.header("authorization"), Some("Bearer abc"));
    assert_eq!(request.json()["title"], "Physics");
    Ok(())
}
