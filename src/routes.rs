use std::{future::Future, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::get,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    AppState, catalog,
    entities::{actor, comment, user},
    error::{AppError, AppResult},
    index_sync,
    models::{
        ActorPatch, ActorPayload, CommentPayload, FilmListQuery, FilmPatch, FilmPayload, FilmView,
        Message, PageQuery, PopulateRequest, SearchQuery, UserPayload,
    },
    search::FilmDocument,
    tasks,
};

type AppStateRef = State<Arc<AppState>>;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/films", get(list_films).post(create_film))
        .route(
            "/films/{uuid}",
            get(film_detail).put(replace_film).patch(patch_film).delete(delete_film),
        )
        .route("/films/{uuid}/comments", axum::routing::post(add_comment))
        .route("/actors", get(list_actors).post(create_actor))
        .route(
            "/actors/{id}",
            get(actor_detail).put(replace_actor).patch(patch_actor).delete(delete_actor),
        )
        .route("/genres", get(list_genres))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(user_detail))
        .route("/search", get(search))
        .route("/populate_db", get(populate_all).post(populate_one).delete(clear_catalog));

    Router::new().nest("/api/v1", api).with_state(state)
}

/// Serves a GET body from the response cache, computing and storing it on a miss.
async fn cached<T, F, Fut>(state: &AppState, uri: &Uri, load: F) -> AppResult<Json<Value>>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let key = uri.to_string();
    if let Some(body) = state.cache.get(&key).await {
        return Ok(Json(body));
    }
    let body = serde_json::to_value(load().await?).map_err(anyhow::Error::from)?;
    state.cache.put(key, body.clone()).await;
    Ok(Json(body))
}

fn created_or_ok(created: bool) -> StatusCode {
    if created { StatusCode::CREATED } else { StatusCode::OK }
}

async fn list_films(
    State(state): AppStateRef,
    uri: Uri,
    Query(q): Query<FilmListQuery>,
) -> AppResult<Json<Value>> {
    cached(&state, &uri, || catalog::list_films(&state.db, &q)).await
}

async fn film_detail(
    State(state): AppStateRef,
    uri: Uri,
    Path(uuid): Path<String>,
) -> AppResult<Json<Value>> {
    cached(&state, &uri, || catalog::film_detail(&state.db, &uuid)).await
}

async fn create_film(
    State(state): AppStateRef,
    Json(payload): Json<FilmPayload>,
) -> AppResult<(StatusCode, Json<FilmView>)> {
    let view = catalog::create_film(&state.db, &payload).await?;
    state.cache.invalidate_all().await;
    index_sync::sync_created(state.index.as_ref(), std::slice::from_ref(&view.film)).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn replace_film(
    State(state): AppStateRef,
    Path(uuid): Path<String>,
    Json(payload): Json<FilmPayload>,
) -> AppResult<(StatusCode, Json<FilmView>)> {
    let (view, created) = catalog::replace_film(&state.db, &uuid, &payload).await?;
    state.cache.invalidate_all().await;
    if created {
        index_sync::sync_created(state.index.as_ref(), std::slice::from_ref(&view.film)).await;
    } else {
        index_sync::sync_updated(state.index.as_ref(), &view.film).await;
    }
    Ok((created_or_ok(created), Json(view)))
}

async fn patch_film(
    State(state): AppStateRef,
    Path(uuid): Path<String>,
    Json(patch): Json<FilmPatch>,
) -> AppResult<Json<FilmView>> {
    let view = catalog::patch_film(&state.db, &uuid, patch).await?;
    state.cache.invalidate_all().await;
    index_sync::sync_updated(state.index.as_ref(), &view.film).await;
    Ok(Json(view))
}

async fn delete_film(State(state): AppStateRef, Path(uuid): Path<String>) -> AppResult<StatusCode> {
    let uuid = catalog::delete_film(&state.db, &uuid).await?;
    state.cache.invalidate_all().await;
    index_sync::sync_deleted(state.index.as_ref(), &uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_comment(
    State(state): AppStateRef,
    Path(uuid): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> AppResult<(StatusCode, Json<comment::Model>)> {
    let comment = catalog::add_comment(&state.db, &uuid, &payload).await?;
    state.cache.invalidate_all().await;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_actors(
    State(state): AppStateRef,
    uri: Uri,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Value>> {
    cached(&state, &uri, || catalog::list_actors(&state.db, &q)).await
}

async fn actor_detail(
    State(state): AppStateRef,
    uri: Uri,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    cached(&state, &uri, || catalog::actor_detail(&state.db, id)).await
}

async fn create_actor(
    State(state): AppStateRef,
    Json(payload): Json<ActorPayload>,
) -> AppResult<(StatusCode, Json<actor::Model>)> {
    let actor = catalog::create_actor(&state.db, &payload).await?;
    state.cache.invalidate_all().await;
    Ok((StatusCode::CREATED, Json(actor)))
}

async fn replace_actor(
    State(state): AppStateRef,
    Path(id): Path<i32>,
    Json(payload): Json<ActorPayload>,
) -> AppResult<(StatusCode, Json<actor::Model>)> {
    let (actor, created) = catalog::replace_actor(&state.db, id, &payload).await?;
    state.cache.invalidate_all().await;
    Ok((created_or_ok(created), Json(actor)))
}

async fn patch_actor(
    State(state): AppStateRef,
    Path(id): Path<i32>,
    Json(patch): Json<ActorPatch>,
) -> AppResult<Json<actor::Model>> {
    let actor = catalog::patch_actor(&state.db, id, patch).await?;
    state.cache.invalidate_all().await;
    Ok(Json(actor))
}

async fn delete_actor(State(state): AppStateRef, Path(id): Path<i32>) -> AppResult<StatusCode> {
    catalog::delete_actor(&state.db, id).await?;
    state.cache.invalidate_all().await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_genres(State(state): AppStateRef, uri: Uri) -> AppResult<Json<Value>> {
    cached(&state, &uri, || catalog::list_genres(&state.db)).await
}

async fn list_users(State(state): AppStateRef) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(catalog::list_users(&state.db).await?))
}

async fn user_detail(State(state): AppStateRef, Path(id): Path<i32>) -> AppResult<Json<user::Model>> {
    Ok(Json(catalog::user_by_id(&state.db, id).await?))
}

async fn create_user(
    State(state): AppStateRef,
    Json(payload): Json<UserPayload>,
) -> AppResult<(StatusCode, Json<user::Model>)> {
    let user = catalog::create_user(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn search(
    State(state): AppStateRef,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<FilmDocument>>> {
    let query = q.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::bad_request("Query parameter is required"));
    }
    match state.index.search(query).await {
        Ok(hits) => Ok(Json(hits)),
        Err(err) => {
            tracing::warn!(query = %query, error = %err, "search failed");
            Err(AppError::not_found(format!("Error, {err}")))
        },
    }
}

async fn populate_all(State(state): AppStateRef) -> Json<Message> {
    tasks::spawn_populate(state, None);
    Json(Message::new("Database population task started."))
}

async fn populate_one(
    State(state): AppStateRef,
    Json(req): Json<PopulateRequest>,
) -> AppResult<Json<Message>> {
    let link = req.link.trim().to_string();
    if link.is_empty() {
        return Err(AppError::bad_request("link is required"));
    }
    let message = Message::new(format!("Film parsing task started for URL: {link}"));
    tasks::spawn_populate(state, Some(link));
    Ok(Json(message))
}

async fn clear_catalog(State(state): AppStateRef) -> AppResult<StatusCode> {
    state.index.clear().await?;
    catalog::clear_catalog(&state.db).await?;
    state.cache.invalidate_all().await;
    tracing::info!("catalog cleared");
    Ok(StatusCode::NO_CONTENT)
}
