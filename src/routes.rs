use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::AppResult,
    extract::{JsonBody, PathParam, QueryParams},
    models::{CreateMovie, Movie, MovieFilter, UpdateMovie, empty_string_as_none},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/recommendations", get(recommended_movies))
        .route(
            "/movies/{id}",
            get(get_movie).put(update_movie).patch(update_movie).delete(delete_movie),
        )
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    QueryParams(filter): QueryParams<MovieFilter>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list(&filter).await?))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<CreateMovie>,
) -> AppResult<impl IntoResponse> {
    let movie = state.movies.create(input).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.get(id).await?))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
    JsonBody(changes): JsonBody<UpdateMovie>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.update(id, changes).await?))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<impl IntoResponse> {
    state.movies.delete(id).await?;
    Ok(Json(json!({ "message": "Movie is Deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(rename = "userId", default, deserialize_with = "empty_string_as_none")]
    user_id: Option<i32>,
}

pub async fn recommended_movies(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<RecommendationQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.recommend(q.user_id).await?))
}
