mod config;
mod db;
mod entities;
mod error;
mod extract;
mod models;
mod repository;
mod routes;
mod service;

use std::sync::Arc;

use crate::{config::Config, repository::SeaOrmMovieRepository, service::MovieService};

#[derive(Clone)]
pub struct AppState {
    pub movies: MovieService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt().with_env_filter(config.log_filter.as_str()).init();

    let db = db::connect_and_migrate(&config.database_url).await?;
    let repo = SeaOrmMovieRepository::new(db);
    let state = Arc::new(AppState { movies: MovieService::new(Arc::new(repo)) });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
