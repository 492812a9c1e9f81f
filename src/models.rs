use std::{fmt, str::FromStr};

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::entities::movie;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<Date>,
    pub duration: Option<i32>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub genre_id: Option<i32>,
    pub language_id: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
}

impl From<movie::Model> for Movie {
    fn from(model: movie::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            release_date: stored_release_date(model.id, model.release_date.as_deref()),
            duration: model.duration,
            image_url: model.image_url,
            genre_id: model.genre_id,
            language_id: model.language_id,
            created_at: to_timestamp(model.created_at),
            updated_at: to_timestamp(model.updated_at),
        }
    }
}

/// A stored date that no longer parses is reported as `null` rather than
/// failing the whole response.
fn stored_release_date(movie_id: i32, raw: Option<&str>) -> Option<Date> {
    let raw = raw?;
    match raw.parse() {
        Ok(date) => Some(date),
        Err(error) => {
            tracing::warn!(movie_id, release_date = raw, %error, "unparseable stored release date");
            None
        },
    }
}

fn to_timestamp(seconds: i64) -> Timestamp {
    Timestamp::from_second(seconds).unwrap_or(Timestamp::UNIX_EPOCH)
}

/// Body of `POST /movies`. Nothing is validated here; missing or malformed
/// values are left for the store to reject.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateMovie {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    /// Older clients send `runtime`; it is stored as `duration`.
    pub runtime: Option<i32>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub genre_id: Option<i32>,
    pub language_id: Option<i32>,
    pub duration: Option<i32>,
}

/// Body of `PUT`/`PATCH /movies/{id}`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateMovie {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub genre_id: Option<i32>,
    pub language_id: Option<i32>,
    pub duration: Option<i32>,
}

/// Fields handed to the repository for an insert. `None` leaves the column
/// to the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewMovie {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<Date>,
    pub duration: Option<i32>,
    pub image_url: Option<String>,
    pub genre_id: Option<i32>,
    pub language_id: Option<i32>,
}

/// Equality filter for `GET /movies`; only the supplied fields constrain the
/// result.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct MovieFilter {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub genre_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub language_id: Option<i32>,
}

pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> movie::Model {
        movie::Model {
            id: 7,
            title: "Heat".to_string(),
            description: None,
            release_date: Some("1995-12-15".to_string()),
            duration: Some(170),
            image_url: Some("https://img.example/heat.jpg".to_string()),
            genre_id: Some(1),
            language_id: Some(2),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn movie_serializes_with_api_field_names() {
        let json = serde_json::to_value(Movie::from(model())).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["releaseDate"], "1995-12-15");
        assert_eq!(json["imageUrl"], "https://img.example/heat.jpg");
        assert_eq!(json["genre_id"], 1);
        assert_eq!(json["language_id"], 2);
        assert_eq!(json["duration"], 170);
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn unparseable_stored_date_becomes_null() {
        let movie = Movie::from(movie::Model {
            release_date: Some("15/12/1995".to_string()),
            ..model()
        });
        assert_eq!(movie.release_date, None);
        assert_eq!(movie.title, "Heat");
        assert_eq!(stored_release_date(7, None), None);
    }

    #[test]
    fn empty_query_values_are_absent() {
        let filter: MovieFilter = serde_json::from_value(serde_json::json!({
            "genre_id": "",
            "language_id": "4",
        }))
        .unwrap();
        assert_eq!(filter, MovieFilter { genre_id: None, language_id: Some(4) });
    }
}
