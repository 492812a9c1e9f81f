use std::collections::BTreeSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait,
    DatabaseBackend, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use crate::{
    entities::{movie, order},
    error::AppResult,
    models::{MovieFilter, NewMovie},
};

/// Genre and language signals taken from a user's past orders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Affinity {
    pub genre_ids: BTreeSet<i32>,
    pub language_ids: BTreeSet<i32>,
    /// Movies the user already ordered; never sampled.
    pub exclude_ids: BTreeSet<i32>,
}

/// A random draw of at most `limit` movies, optionally restricted to those
/// sharing a genre or language with `affinity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovieSample {
    pub affinity: Option<Affinity>,
    pub limit: u64,
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn find_movies(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>>;

    async fn find_movie(&self, id: i32) -> AppResult<Option<movie::Model>>;

    async fn insert_movie(&self, movie: NewMovie) -> AppResult<movie::Model>;

    /// Writes every column of `movie` back to the store and bumps `updated_at`.
    async fn save_movie(&self, movie: movie::Model) -> AppResult<movie::Model>;

    async fn delete_movie(&self, movie: movie::Model) -> AppResult<()>;

    async fn orders_with_movies(
        &self,
        user_id: i32,
    ) -> AppResult<Vec<(order::Model, Vec<movie::Model>)>>;

    async fn sample_movies(&self, sample: &MovieSample) -> AppResult<Vec<movie::Model>>;
}

#[derive(Clone)]
pub struct SeaOrmMovieRepository {
    db: DatabaseConnection,
}

impl SeaOrmMovieRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn random_order(&self) -> sea_orm::sea_query::SimpleExpr {
        match self.db.get_database_backend() {
            DatabaseBackend::MySql => Expr::cust("RAND()"),
            _ => Expr::cust("RANDOM()"),
        }
    }
}

#[async_trait]
impl MovieRepository for SeaOrmMovieRepository {
    async fn find_movies(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>> {
        let mut query = movie::Entity::find();
        if let Some(genre_id) = filter.genre_id {
            query = query.filter(movie::Column::GenreId.eq(genre_id));
        }
        if let Some(language_id) = filter.language_id {
            query = query.filter(movie::Column::LanguageId.eq(language_id));
        }
        Ok(query.all(&self.db).await?)
    }

    async fn find_movie(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_movie(&self, movie: NewMovie) -> AppResult<movie::Model> {
        let now = now_sec();
        let model = movie::ActiveModel {
            id: NotSet,
            title: movie.title.map_or(NotSet, Set),
            description: Set(movie.description),
            release_date: Set(movie.release_date.map(|d| d.to_string())),
            duration: Set(movie.duration),
            image_url: Set(movie.image_url),
            genre_id: Set(movie.genre_id),
            language_id: Set(movie.language_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn save_movie(&self, movie: movie::Model) -> AppResult<movie::Model> {
        let mut model = movie.into_active_model().reset_all();
        model.updated_at = Set(now_sec());

        Ok(model.update(&self.db).await?)
    }

    async fn delete_movie(&self, movie: movie::Model) -> AppResult<()> {
        movie.delete(&self.db).await?;
        Ok(())
    }

    async fn orders_with_movies(
        &self,
        user_id: i32,
    ) -> AppResult<Vec<(order::Model, Vec<movie::Model>)>> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_asc(order::Column::Id)
            .find_with_related(movie::Entity)
            .all(&self.db)
            .await?;

        Ok(orders)
    }

    async fn sample_movies(&self, sample: &MovieSample) -> AppResult<Vec<movie::Model>> {
        let mut query = movie::Entity::find();

        if let Some(affinity) = &sample.affinity {
            query = query
                .filter(
                    Condition::any()
                        .add(movie::Column::LanguageId.is_in(affinity.language_ids.iter().copied()))
                        .add(movie::Column::GenreId.is_in(affinity.genre_ids.iter().copied())),
                )
                .filter(movie::Column::Id.is_not_in(affinity.exclude_ids.iter().copied()));
        }

        let movies =
            query.order_by_asc(self.random_order()).limit(sample.limit).all(&self.db).await?;

        Ok(movies)
    }
}

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        entities::{genre, language, order_movie},
    };

    async fn setup() -> SeaOrmMovieRepository {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        for (id, name) in [(1, "Drama"), (2, "Comedy"), (3, "Horror")] {
            genre::ActiveModel { id: Set(id), name: Set(name.to_string()) }
                .insert(&db)
                .await
                .unwrap();
        }
        for (id, name) in [(1, "English"), (2, "French")] {
            language::ActiveModel { id: Set(id), name: Set(name.to_string()) }
                .insert(&db)
                .await
                .unwrap();
        }
        SeaOrmMovieRepository::new(db)
    }

    async fn add_movie(
        repo: &SeaOrmMovieRepository,
        title: &str,
        genre_id: i32,
        language_id: i32,
    ) -> movie::Model {
        repo.insert_movie(NewMovie {
            title: Some(title.to_string()),
            genre_id: Some(genre_id),
            language_id: Some(language_id),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    async fn add_order(repo: &SeaOrmMovieRepository, user_id: i32, movie_ids: &[i32]) -> i32 {
        let order = order::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            created_at: Set(now_sec()),
        }
        .insert(&repo.db)
        .await
        .unwrap();
        for &movie_id in movie_ids {
            order_movie::ActiveModel { order_id: Set(order.id), movie_id: Set(movie_id) }
                .insert(&repo.db)
                .await
                .unwrap();
        }
        order.id
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let repo = setup().await;
        let movie = repo
            .insert_movie(NewMovie {
                title: Some("Alien".to_string()),
                release_date: Some("1979-05-25".parse().unwrap()),
                duration: Some(117),
                genre_id: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(movie.id > 0);
        assert_eq!(movie.release_date.as_deref(), Some("1979-05-25"));
        assert!(movie.created_at > 0);
        assert_eq!(repo.find_movie(movie.id).await.unwrap(), Some(movie));
    }

    #[tokio::test]
    async fn insert_without_title_is_rejected_by_store() {
        let repo = setup().await;
        assert!(repo.insert_movie(NewMovie::default()).await.is_err());
    }

    #[tokio::test]
    async fn insert_with_unknown_genre_is_rejected_by_store() {
        let repo = setup().await;
        let result = repo
            .insert_movie(NewMovie {
                title: Some("Ghost".to_string()),
                genre_id: Some(99),
                ..Default::default()
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn find_movies_applies_only_supplied_filters() {
        let repo = setup().await;
        add_movie(&repo, "a", 1, 1).await;
        add_movie(&repo, "b", 1, 2).await;
        add_movie(&repo, "c", 2, 1).await;

        let titles = |movies: Vec<movie::Model>| {
            let mut t: Vec<String> = movies.into_iter().map(|m| m.title).collect();
            t.sort();
            t
        };

        let all = repo.find_movies(&MovieFilter::default()).await.unwrap();
        assert_eq!(titles(all), ["a", "b", "c"]);
        let by_genre = MovieFilter { genre_id: Some(1), language_id: None };
        assert_eq!(titles(repo.find_movies(&by_genre).await.unwrap()), ["a", "b"]);
        let both = MovieFilter { genre_id: Some(1), language_id: Some(2) };
        assert_eq!(titles(repo.find_movies(&both).await.unwrap()), ["b"]);
        let none = MovieFilter { genre_id: Some(3), language_id: None };
        assert!(repo.find_movies(&none).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_and_delete_round_trip() {
        let repo = setup().await;
        let mut movie = add_movie(&repo, "Before", 1, 1).await;
        movie.title = "After".to_string();
        movie.duration = Some(90);

        let saved = repo.save_movie(movie.clone()).await.unwrap();
        assert_eq!(saved.title, "After");
        assert_eq!(saved.duration, Some(90));
        assert!(saved.updated_at >= movie.updated_at);

        repo.delete_movie(saved.clone()).await.unwrap();
        assert_eq!(repo.find_movie(saved.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_an_ordered_movie_cascades_to_orders() {
        let repo = setup().await;
        let movie = add_movie(&repo, "Ordered", 1, 1).await;
        add_order(&repo, 5, &[movie.id]).await;

        repo.delete_movie(movie).await.unwrap();

        let orders = repo.orders_with_movies(5).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].1.is_empty());
    }

    #[tokio::test]
    async fn orders_with_movies_loads_associations_per_user() {
        let repo = setup().await;
        let a = add_movie(&repo, "a", 1, 1).await;
        let b = add_movie(&repo, "b", 2, 2).await;
        let c = add_movie(&repo, "c", 3, 1).await;
        add_order(&repo, 1, &[a.id, b.id]).await;
        add_order(&repo, 1, &[c.id]).await;
        add_order(&repo, 2, &[a.id]).await;

        let orders = repo.orders_with_movies(1).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|(o, _)| o.user_id == 1));
        let mut ids: Vec<i32> = orders.iter().flat_map(|(_, m)| m.iter().map(|m| m.id)).collect();
        ids.sort();
        assert_eq!(ids, [a.id, b.id, c.id]);

        assert!(repo.orders_with_movies(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sample_respects_limit_affinity_and_exclusions() {
        let repo = setup().await;
        let seen = add_movie(&repo, "seen", 1, 1).await;
        let same_genre = add_movie(&repo, "same genre", 1, 2).await;
        let same_language = add_movie(&repo, "same language", 2, 1).await;
        add_movie(&repo, "unrelated", 3, 2).await;

        let sample = MovieSample {
            affinity: Some(Affinity {
                genre_ids: BTreeSet::from([1]),
                language_ids: BTreeSet::from([1]),
                exclude_ids: BTreeSet::from([seen.id]),
            }),
            limit: 5,
        };
        let mut ids: Vec<i32> =
            repo.sample_movies(&sample).await.unwrap().into_iter().map(|m| m.id).collect();
        ids.sort();
        assert_eq!(ids, [same_genre.id, same_language.id]);

        let unfiltered = MovieSample { affinity: None, limit: 3 };
        assert_eq!(repo.sample_movies(&unfiltered).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn sample_with_empty_affinity_matches_nothing() {
        let repo = setup().await;
        add_movie(&repo, "a", 1, 1).await;

        let sample = MovieSample { affinity: Some(Affinity::default()), limit: 5 };
        assert!(repo.sample_movies(&sample).await.unwrap().is_empty());
    }
}
