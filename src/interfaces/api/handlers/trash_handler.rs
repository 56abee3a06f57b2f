use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::application::dtos::trash_dto::{
    BatchOutcome, MoveManyToTrashRequest, PurgeSummary, TrashEntryDto, TrashIdsRequest,
};
use crate::common::di::AppState;
use crate::domain::entities::collection::Collection;
use crate::interfaces::api::handlers::ApiResult;
use crate::interfaces::middleware::actor::PortalActor;

/// Lists every trash entry, most recently deleted first
#[instrument(skip(state))]
pub async fn list_trash(State(state): State<AppState>) -> ApiResult<Json<Vec<TrashEntryDto>>> {
    let items = state.trash_service.fetch_trash().await?;
    debug!("Returning {} trash entries", items.len());
    Ok(Json(items))
}

/// Live trash listing as Server-Sent Events
pub async fn watch_trash(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Opening live trash listing");

    let stream = state.trash_service.watch_trash().map(|snapshot| {
        let event = match snapshot {
            Ok(items) => Event::default()
                .event("snapshot")
                .json_data(&items)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Ok::<Event, Infallible>(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Moves one record to the trash
#[instrument(skip(state))]
pub async fn move_to_trash(
    State(state): State<AppState>,
    actor: PortalActor,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<TrashEntryDto>> {
    let collection = collection.parse::<Collection>()?;
    let entry = state.trash_service.move_to_trash(collection, &id, actor.as_deref()).await?;
    Ok(Json(entry))
}

/// Moves several records of one collection to the trash
#[instrument(skip(state))]
pub async fn move_many_to_trash(
    State(state): State<AppState>,
    actor: PortalActor,
    Path(collection): Path<String>,
    Json(request): Json<MoveManyToTrashRequest>,
) -> ApiResult<Json<BatchOutcome>> {
    let collection = collection.parse::<Collection>()?;
    let outcome = state
        .trash_service
        .move_many_to_trash(collection, &request.ids, actor.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// Restores an entry to its original collection
#[instrument(skip(state))]
pub async fn restore(
    State(state): State<AppState>,
    Path(trash_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.trash_service.restore(&trash_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Item restored successfully"
    })))
}

#[instrument(skip(state))]
pub async fn restore_many(
    State(state): State<AppState>,
    Json(request): Json<TrashIdsRequest>,
) -> ApiResult<Json<BatchOutcome>> {
    let outcome = state.trash_service.restore_many(&request.trash_ids).await?;
    Ok(Json(outcome))
}

/// Permanently deletes an entry; unknown ids succeed as well
#[instrument(skip(state))]
pub async fn permanently_delete(
    State(state): State<AppState>,
    Path(trash_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.trash_service.permanently_delete(&trash_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Item deleted permanently"
    })))
}

#[instrument(skip(state))]
pub async fn permanently_delete_many(
    State(state): State<AppState>,
    Json(request): Json<TrashIdsRequest>,
) -> ApiResult<Json<Value>> {
    state.trash_service.permanently_delete_many(&request.trash_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Items deleted permanently"
    })))
}

#[instrument(skip(state))]
pub async fn empty_trash(State(state): State<AppState>) -> ApiResult<Json<PurgeSummary>> {
    let summary = state.trash_service.empty_trash().await?;
    Ok(Json(summary))
}

/// Converts records still flagged `deleted: true` into trash entries
#[instrument(skip(state))]
pub async fn absorb_flagged(
    State(state): State<AppState>,
    actor: PortalActor,
    Path(collection): Path<String>,
) -> ApiResult<Json<BatchOutcome>> {
    let collection = collection.parse::<Collection>()?;
    let outcome = state
        .trash_service
        .absorb_flagged_records(collection, actor.as_deref())
        .await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use crate::application::services::trash_service::TrashService;
    use crate::common::di::AppState;
    use crate::domain::entities::collection::{Document, TRASH_COLLECTION};
    use crate::domain::repositories::document_store::{
        ChangeEvent, DocumentStore, OrderBy, StoreError, StoreResult, StoredDocument, WriteBatch,
    };
    use crate::infrastructure::repositories::memory_document_store::MemoryDocumentStore;
    use crate::interfaces::api::routes::create_api_routes;

    // Store that is always unreachable
    struct DownStore {
        changes: broadcast::Sender<ChangeEvent>,
    }

    impl DownStore {
        fn new() -> Self {
            let (changes, _) = broadcast::channel(8);
            Self { changes }
        }

        fn unavailable<T>() -> StoreResult<T> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl DocumentStore for DownStore {
        async fn get(&self, _collection: &str, _id: &str) -> StoreResult<Option<Document>> {
            Self::unavailable()
        }

        async fn put(&self, _collection: &str, _id: &str, _data: Document) -> StoreResult<()> {
            Self::unavailable()
        }

        async fn delete(&self, _collection: &str, _id: &str) -> StoreResult<()> {
            Self::unavailable()
        }

        fn new_id(&self, _collection: &str) -> String {
            "unused".to_string()
        }

        async fn query(
            &self,
            _collection: &str,
            _order_by: Option<&OrderBy>,
        ) -> StoreResult<Vec<StoredDocument>> {
            Self::unavailable()
        }

        async fn commit(&self, _batch: WriteBatch) -> StoreResult<()> {
            Self::unavailable()
        }

        fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
            self.changes.subscribe()
        }
    }

    fn app(store: Arc<MemoryDocumentStore>) -> Router {
        let state = AppState::new(Arc::new(TrashService::new(store)));
        create_api_routes().with_state(state)
    }

    /// Opens the live listing and returns its first frame as text
    async fn first_live_frame(app: Router) -> String {
        let request = Request::builder().uri("/trash/live").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let mut frames = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(1), frames.next())
            .await
            .expect("first frame")
            .unwrap()
            .unwrap();
        String::from_utf8(frame.to_vec()).unwrap()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_move_list_and_restore_over_http() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("contacts", "c1", doc(json!({ "name": "Purchase cell" }))).await.unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/collections/contacts/c1/trash")
            .header("x-portal-actor", "hod")
            .body(Body::empty())
            .unwrap();
        let (status, moved) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["original_collection"], json!("contacts"));
        assert_eq!(moved["deleted_by"], json!("hod"));

        let request = Request::builder().uri("/trash").body(Body::empty()).unwrap();
        let (status, listed) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let trash_id = moved["trash_id"].as_str().unwrap().to_string();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/trash/{}/restore", trash_id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.get("contacts", "c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_errors_map_to_status_codes() {
        let store = Arc::new(MemoryDocumentStore::new());

        let request = Request::builder()
            .method("POST")
            .uri("/collections/contacts/ghost/trash")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));

        let request = Request::builder()
            .method("POST")
            .uri("/collections/payroll/x/trash")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("DELETE")
            .uri("/trash/not-there")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(store), request).await;
        assert_eq!(status, StatusCode::OK, "Permanent delete is idempotent");
    }

    #[tokio::test]
    async fn test_batch_endpoints() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("users", "u1", doc(json!({ "email": "x@dept.example" }))).await.unwrap();

        let (status, outcome) = send(
            app(store.clone()),
            post_json("/collections/users/trash", json!({ "ids": ["u1", "u2"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["processed"], json!(["u1"]));
        assert_eq!(outcome["skipped"], json!(["u2"]));

        let trash_ids: Vec<String> = store
            .query(TRASH_COLLECTION, None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();

        let (status, _) = send(
            app(store.clone()),
            post_json("/trash/purge", json!({ "trash_ids": trash_ids })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.count(TRASH_COLLECTION).await, 0);
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn test_empty_trash_endpoint_reports_count() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("sops", "s1", doc(json!({ "title": "Fire safety" }))).await.unwrap();
        send(
            app(store.clone()),
            post_json("/collections/sops/trash", json!({ "ids": ["s1"] })),
        )
        .await;

        let request = Request::builder().method("DELETE").uri("/trash").body(Body::empty()).unwrap();
        let (status, summary) = send(app(store), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["removed"], json!(1));
    }

    #[tokio::test]
    async fn test_live_listing_starts_with_snapshot_event() {
        let store = Arc::new(MemoryDocumentStore::new());

        let frame = first_live_frame(app(store)).await;

        assert!(frame.contains("event: snapshot\n"), "unexpected frame: {:?}", frame);
        assert!(frame.contains("data: []\n"), "unexpected frame: {:?}", frame);
    }

    #[tokio::test]
    async fn test_live_listing_reports_read_failure_as_error_event() {
        let state = AppState::new(Arc::new(TrashService::new(Arc::new(DownStore::new()))));
        let app = create_api_routes().with_state(state);

        let frame = first_live_frame(app).await;

        assert!(frame.contains("event: error\n"), "unexpected frame: {:?}", frame);
        assert!(frame.contains("connection refused"), "unexpected frame: {:?}", frame);
        assert!(!frame.contains("data: []"), "A failed read must not look like an empty trash");
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_service_unavailable() {
        let state = AppState::new(Arc::new(TrashService::new(Arc::new(DownStore::new()))));
        let app = create_api_routes().with_state(state);

        let request = Request::builder().uri("/trash").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_restore_many_endpoint_reports_skipped_ids() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("requirements", "r1", doc(json!({ "title": "Beakers" }))).await.unwrap();
        let (_, moved) = send(
            app(store.clone()),
            post_json("/collections/requirements/trash", json!({ "ids": ["r1"] })),
        )
        .await;
        assert_eq!(moved["processed"], json!(["r1"]));
        let trash_id = store.query(TRASH_COLLECTION, None).await.unwrap()[0].id.clone();

        let (status, outcome) = send(
            app(store.clone()),
            post_json("/trash/restore", json!({ "trash_ids": [trash_id, "gone"] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["processed"], json!([trash_id]));
        assert_eq!(outcome["skipped"], json!(["gone"]));
        assert_eq!(store.count(TRASH_COLLECTION).await, 0);
        assert!(store.get("requirements", "r1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_absorb_flagged_endpoint_moves_flagged_records() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("users", "u1", doc(json!({ "email": "old@dept.example", "deleted": true }))).await.unwrap();
        store.put("users", "u2", doc(json!({ "email": "new@dept.example" }))).await.unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/collections/users/absorb-flagged")
            .header("x-portal-actor", "registrar")
            .body(Body::empty())
            .unwrap();
        let (status, outcome) = send(app(store.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["processed"], json!(["u1"]));
        assert!(store.get("users", "u1").await.unwrap().is_none());
        assert!(store.get("users", "u2").await.unwrap().is_some());

        let entries = store.query(TRASH_COLLECTION, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data["deletedBy"], json!("registrar"));
        assert!(entries[0].data["data"].get("deleted").is_none());
    }
}
