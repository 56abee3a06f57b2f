use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::common::di::AppState;
use crate::interfaces::api::handlers::trash_handler;

/// Crea las rutas de la API de la papelera
pub fn create_api_routes() -> Router<AppState> {
    let trash_routes = Router::new()
        .route("/", get(trash_handler::list_trash).delete(trash_handler::empty_trash))
        .route("/live", get(trash_handler::watch_trash))
        .route("/restore", post(trash_handler::restore_many))
        .route("/purge", post(trash_handler::permanently_delete_many))
        .route("/{trash_id}", delete(trash_handler::permanently_delete))
        .route("/{trash_id}/restore", post(trash_handler::restore));

    let collection_routes = Router::new()
        .route("/{collection}/trash", post(trash_handler::move_many_to_trash))
        .route("/{collection}/absorb-flagged", post(trash_handler::absorb_flagged))
        .route("/{collection}/{id}/trash", post(trash_handler::move_to_trash));

    Router::new()
        .nest("/trash", trash_routes)
        .nest("/collections", collection_routes)
}
