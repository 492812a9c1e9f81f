use std::sync::Arc;

use jiff::civil::Date;
use tracing::{debug, info};

use crate::{
    entities::{movie, order},
    error::{AppError, AppResult},
    models::{CreateMovie, Movie, MovieFilter, NewMovie, UpdateMovie},
    repository::{Affinity, MovieRepository, MovieSample},
};

/// Upper bound on movies drawn from the user's genre/language affinity.
pub const RECOMMENDATION_LIMIT: u64 = 5;
/// Unfiltered random movies appended to every recommendation list.
pub const FALLBACK_LIMIT: u64 = 10;

#[derive(Clone)]
pub struct MovieService {
    repo: Arc<dyn MovieRepository>,
}

impl MovieService {
    pub fn new(repo: Arc<dyn MovieRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let movies = self.repo.find_movies(filter).await?;
        debug!(
            genre_id = ?filter.genre_id,
            language_id = ?filter.language_id,
            count = movies.len(),
            "listed movies"
        );
        Ok(movies.into_iter().map(Movie::from).collect())
    }

    pub async fn create(&self, input: CreateMovie) -> AppResult<Movie> {
        let release_date = input.release_date.as_deref().map(str::parse::<Date>).transpose()?;

        let movie = self
            .repo
            .insert_movie(NewMovie {
                title: input.title,
                description: input.description,
                release_date,
                duration: input.duration.or(input.runtime),
                image_url: input.image_url,
                genre_id: input.genre_id,
                language_id: input.language_id,
            })
            .await?;

        info!(movie_id = movie.id, title = %movie.title, "created movie");
        Ok(movie.into())
    }

    pub async fn get(&self, id: i32) -> AppResult<Movie> {
        let movie = self.repo.find_movie(id).await?.ok_or(AppError::NotFound)?;
        Ok(movie.into())
    }

    /// Merges `changes` into the stored movie. Empty strings, zero and missing
    /// values leave the stored field as it was, so a field can never be
    /// cleared through this call.
    pub async fn update(&self, id: i32, changes: UpdateMovie) -> AppResult<Movie> {
        let stored = self.repo.find_movie(id).await?.ok_or(AppError::NotFound)?;
        let mut movie = stored.clone();

        if let Some(title) = truthy(changes.title) {
            movie.title = title;
        }
        if let Some(description) = truthy(changes.description) {
            movie.description = Some(description);
        }
        if let Some(release_date) = truthy(changes.release_date) {
            movie.release_date = Some(release_date.parse::<Date>()?.to_string());
        }
        if let Some(duration) = truthy(changes.duration) {
            movie.duration = Some(duration);
        }
        if let Some(image_url) = truthy(changes.image_url) {
            movie.image_url = Some(image_url);
        }
        if let Some(genre_id) = truthy(changes.genre_id) {
            movie.genre_id = Some(genre_id);
        }
        if let Some(language_id) = truthy(changes.language_id) {
            movie.language_id = Some(language_id);
        }

        if movie == stored {
            debug!(movie_id = id, "update carried no changes");
            return Ok(stored.into());
        }

        let movie = self.repo.save_movie(movie).await?;
        debug!(movie_id = id, "updated movie");
        Ok(movie.into())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let movie = self.repo.find_movie(id).await?.ok_or(AppError::NotFound)?;
        self.repo.delete_movie(movie).await?;
        info!(movie_id = id, "deleted movie");
        Ok(())
    }

    /// Up to [`RECOMMENDATION_LIMIT`] unseen movies sharing a genre or
    /// language with the user's past orders, followed by up to
    /// [`FALLBACK_LIMIT`] random movies. The two halves are not deduplicated.
    pub async fn recommend(&self, user_id: Option<i32>) -> AppResult<Vec<Movie>> {
        let orders = match user_id {
            Some(user_id) => self.repo.orders_with_movies(user_id).await?,
            None => Vec::new(),
        };

        let mut movies = if orders.is_empty() {
            Vec::new()
        } else {
            let affinity = affinity_from_orders(&orders);
            debug!(
                user_id = ?user_id,
                orders = orders.len(),
                genres = affinity.genre_ids.len(),
                languages = affinity.language_ids.len(),
                excluded = affinity.exclude_ids.len(),
                "sampling by affinity"
            );
            let sample = MovieSample { affinity: Some(affinity), limit: RECOMMENDATION_LIMIT };
            self.repo.sample_movies(&sample).await?
        };
        let personalized = movies.len();

        let fallback =
            self.repo.sample_movies(&MovieSample { affinity: None, limit: FALLBACK_LIMIT }).await?;
        movies.extend(fallback);

        debug!(user_id = ?user_id, personalized, total = movies.len(), "built recommendations");
        Ok(movies.into_iter().map(Movie::from).collect())
    }
}

fn affinity_from_orders(orders: &[(order::Model, Vec<movie::Model>)]) -> Affinity {
    let mut affinity = Affinity::default();
    for movie in orders.iter().flat_map(|(_, movies)| movies) {
        affinity.exclude_ids.insert(movie.id);
        affinity.genre_ids.extend(movie.genre_id);
        affinity.language_ids.extend(movie.language_id);
    }
    affinity
}

trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for i32 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

fn truthy<T: Truthy>(value: Option<T>) -> Option<T> {
    value.filter(T::is_truthy)
}
