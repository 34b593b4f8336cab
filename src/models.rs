use std::fmt;

use jiff::civil::Date;
use sea_orm::{FromQueryResult, Set};
use serde::{Deserialize, Serialize};

use crate::entities::{actor, film};

/// Calendar components read from a film page. Missing parts fall back to
/// 1900-01-01 component by component.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub year: i16,
    pub month: i8,
    pub day: i8,
}

impl Default for ReleaseDate {
    fn default() -> Self {
        Self { year: 1900, month: 1, day: 1 }
    }
}

impl ReleaseDate {
    pub fn to_date(self) -> Result<Date, ValidationError> {
        Date::new(self.year, self.month, self.day)
            .map_err(|_| ValidationError::ReleaseDate(self.to_string()))
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.day)
    }
}

/// A film as scraped from a page, before it touches the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmRecord {
    pub title: String,
    pub title_original: String,
    pub release_date: ReleaseDate,
    pub length: i32,
    pub rating: f64,
    pub description: String,
    pub distributed_by: String,
    pub budget: String,
    pub poster: String,
    pub trailer: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("invalid date: {0}")]
    ReleaseDate(String),
    #[error("rating {0} is outside 0..=10")]
    Rating(f64),
    #[error("length must not be negative, got {0}")]
    Length(i32),
}

/// Scalar film fields that passed validation and can be written.
#[derive(Clone, Debug, PartialEq)]
pub struct NewFilm {
    pub title: String,
    pub title_original: String,
    pub release_date: Date,
    pub description: String,
    pub distributed_by: String,
    pub length: i32,
    pub rating: f64,
    pub budget: String,
    pub poster: String,
    pub trailer: String,
}

impl NewFilm {
    pub fn from_record(record: &FilmRecord) -> Result<Self, ValidationError> {
        let film = Self {
            title: record.title.clone(),
            title_original: record.title_original.clone(),
            release_date: record.release_date.to_date()?,
            description: record.description.clone(),
            distributed_by: record.distributed_by.clone(),
            length: record.length,
            rating: record.rating,
            budget: record.budget.clone(),
            poster: record.poster.clone(),
            trailer: record.trailer.clone(),
        };
        film.validate()?;
        Ok(film)
    }

    pub fn from_payload(payload: &FilmPayload) -> Result<Self, ValidationError> {
        let release_date = payload
            .release_date
            .trim()
            .parse::<Date>()
            .map_err(|_| ValidationError::ReleaseDate(payload.release_date.clone()))?;
        let film = Self {
            title: payload.title.trim().to_string(),
            title_original: payload.title_original.trim().to_string(),
            release_date,
            description: payload.description.clone(),
            distributed_by: payload.distributed_by.clone(),
            length: payload.length,
            rating: payload.rating,
            budget: payload.budget.clone(),
            poster: payload.poster.clone(),
            trailer: payload.trailer.clone(),
        };
        if film.title.is_empty() {
            return Err(ValidationError::Empty("title"));
        }
        if film.title_original.is_empty() {
            return Err(ValidationError::Empty("title_original"));
        }
        film.validate()?;
        Ok(film)
    }

    /// Range checks shared by scraped records and API payloads. Scraped
    /// titles may be empty when the page lacks them.
    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=10.0).contains(&self.rating) {
            return Err(ValidationError::Rating(self.rating));
        }
        if self.length < 0 {
            return Err(ValidationError::Length(self.length));
        }
        Ok(())
    }

    /// Fresh row with a newly generated uuid.
    pub fn into_active_model(self) -> film::ActiveModel {
        let mut model = film::ActiveModel {
            uuid: Set(uuid::Uuid::new_v4().to_string()),
            ..Default::default()
        };
        self.apply_to(&mut model);
        model
    }

    /// Overwrites every scalar column, leaving the id and uuid alone.
    pub fn apply_to(self, model: &mut film::ActiveModel) {
        model.title = Set(self.title);
        model.title_original = Set(self.title_original);
        model.release_date = Set(self.release_date.to_string());
        model.description = Set(self.description);
        model.distributed_by = Set(self.distributed_by);
        model.length = Set(self.length);
        model.rating = Set(self.rating);
        model.budget = Set(self.budget);
        model.poster = Set(self.poster);
        model.trailer = Set(self.trailer);
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct NamedRef {
    pub name: String,
}

/// Body of `POST /films` and `PUT /films/{uuid}`.
#[derive(Clone, Debug, Deserialize)]
pub struct FilmPayload {
    pub title: String,
    pub title_original: String,
    pub release_date: String,
    pub distributed_by: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub length: i32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub trailer: String,
    pub actors: Option<Vec<NamedRef>>,
    pub genres: Option<Vec<NamedRef>>,
}

impl From<&film::Model> for FilmPayload {
    fn from(film: &film::Model) -> Self {
        Self {
            title: film.title.clone(),
            title_original: film.title_original.clone(),
            release_date: film.release_date.clone(),
            distributed_by: film.distributed_by.clone(),
            description: film.description.clone(),
            length: film.length,
            rating: film.rating,
            budget: film.budget.clone(),
            poster: film.poster.clone(),
            trailer: film.trailer.clone(),
            actors: None,
            genres: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilmPatch {
    pub title: Option<String>,
    pub title_original: Option<String>,
    pub release_date: Option<String>,
    pub distributed_by: Option<String>,
    pub description: Option<String>,
    pub length: Option<i32>,
    pub rating: Option<f64>,
    pub budget: Option<String>,
    pub poster: Option<String>,
    pub trailer: Option<String>,
    pub actors: Option<Vec<NamedRef>>,
    pub genres: Option<Vec<NamedRef>>,
}

impl FilmPatch {
    pub fn apply(self, mut base: FilmPayload) -> FilmPayload {
        if let Some(v) = self.title {
            base.title = v;
        }
        if let Some(v) = self.title_original {
            base.title_original = v;
        }
        if let Some(v) = self.release_date {
            base.release_date = v;
        }
        if let Some(v) = self.distributed_by {
            base.distributed_by = v;
        }
        if let Some(v) = self.description {
            base.description = v;
        }
        if let Some(v) = self.length {
            base.length = v;
        }
        if let Some(v) = self.rating {
            base.rating = v;
        }
        if let Some(v) = self.budget {
            base.budget = v;
        }
        if let Some(v) = self.poster {
            base.poster = v;
        }
        if let Some(v) = self.trailer {
            base.trailer = v;
        }
        base.actors = self.actors;
        base.genres = self.genres;
        base
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FilmListQuery {
    pub page: Option<u64>,
    pub offset: Option<u64>,
    pub genre: Option<String>,
    pub year_from: Option<i16>,
    pub year_to: Option<i16>,
    pub rating_from: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, Serialize, FromQueryResult)]
pub struct FilmSummary {
    pub title: String,
    pub uuid: String,
    pub title_original: String,
    pub poster: String,
    pub rating: f64,
    pub description: String,
    pub release_date: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilmView {
    #[serde(flatten)]
    pub film: film::Model,
    pub actors: Vec<NamedRef>,
    pub genres: Vec<NamedRef>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommentView {
    pub username: String,
    pub created_at: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilmDetail {
    pub film: FilmView,
    pub comments: Vec<CommentView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilmRef {
    pub title: String,
    pub title_original: String,
    pub uuid: String,
    pub poster: String,
}

impl From<film::Model> for FilmRef {
    fn from(film: film::Model) -> Self {
        Self {
            title: film.title,
            title_original: film.title_original,
            uuid: film.uuid,
            poster: film.poster,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActorView {
    #[serde(flatten)]
    pub actor: actor::Model,
    pub films: Vec<FilmRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ActorPayload {
    pub name: String,
    pub birthday: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActorPatch {
    pub name: Option<String>,
    pub birthday: Option<String>,
    pub is_active: Option<bool>,
}

impl ActorPayload {
    /// Trimmed name and a normalized birthday.
    pub fn validate(&self) -> Result<(String, Option<String>), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        let birthday = self
            .birthday
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<Date>()
                    .map(|d| d.to_string())
                    .map_err(|_| ValidationError::ReleaseDate(raw.to_string()))
            })
            .transpose()?;
        Ok((name.to_string(), birthday))
    }
}

impl ActorPatch {
    pub fn apply(self, actor: &actor::Model) -> ActorPayload {
        ActorPayload {
            name: self.name.unwrap_or_else(|| actor.name.clone()),
            birthday: self.birthday.or_else(|| actor.birthday.clone()),
            is_active: self.is_active.unwrap_or(actor.is_active),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommentPayload {
    pub text: String,
    pub user_id: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserPayload {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopulateRequest {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FilmRecord {
        FilmRecord {
            title: "Stalker".to_string(),
            title_original: "Сталкер".to_string(),
            release_date: ReleaseDate { year: 1979, month: 5, day: 25 },
            length: 162,
            rating: 8.1,
            distributed_by: "Mosfilm".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn release_date_defaults_to_1900() {
        let date = ReleaseDate::default();
        assert_eq!(date.to_date().unwrap().to_string(), "1900-01-01");
    }

    #[test]
    fn new_film_from_valid_record() {
        let film = NewFilm::from_record(&record()).unwrap();
        assert_eq!(film.release_date.to_string(), "1979-05-25");
        assert_eq!(film.length, 162);
    }

    #[test]
    fn new_film_rejects_impossible_date() {
        let mut rec = record();
        rec.release_date = ReleaseDate { year: 2001, month: 2, day: 30 };
        assert_eq!(
            NewFilm::from_record(&rec),
            Err(ValidationError::ReleaseDate("2001-2-30".to_string()))
        );
    }

    #[test]
    fn scraped_record_without_original_title_is_accepted() {
        let mut rec = record();
        rec.title_original = String::new();
        let film = NewFilm::from_record(&rec).unwrap();
        assert_eq!(film.title_original, "");
        assert_eq!(film.title, "Stalker");
    }

    #[test]
    fn payload_without_original_title_is_rejected() {
        let payload = FilmPayload {
            title: "Stalker".to_string(),
            title_original: "  ".to_string(),
            release_date: "1979-05-25".to_string(),
            distributed_by: "Mosfilm".to_string(),
            description: String::new(),
            length: 162,
            rating: 8.1,
            budget: String::new(),
            poster: String::new(),
            trailer: String::new(),
            actors: None,
            genres: None,
        };
        assert_eq!(NewFilm::from_payload(&payload), Err(ValidationError::Empty("title_original")));
    }

    #[test]
    fn new_film_rejects_rating_out_of_range() {
        let mut rec = record();
        rec.rating = 11.0;
        assert_eq!(NewFilm::from_record(&rec), Err(ValidationError::Rating(11.0)));
    }

    #[test]
    fn patch_overrides_only_given_fields() {
        let base = FilmPayload {
            title: "Old".to_string(),
            title_original: "Old".to_string(),
            release_date: "2000-01-01".to_string(),
            distributed_by: "Dist".to_string(),
            description: "desc".to_string(),
            length: 90,
            rating: 5.0,
            budget: String::new(),
            poster: String::new(),
            trailer: String::new(),
            actors: None,
            genres: None,
        };
        let patch = FilmPatch { rating: Some(9.9), ..Default::default() };
        let merged = patch.apply(base);
        assert_eq!(merged.rating, 9.9);
        assert_eq!(merged.title, "Old");
        assert_eq!(merged.description, "desc");
    }

    #[test]
    fn actor_birthday_is_normalized() {
        let payload = ActorPayload {
            name: " Anatoly Solonitsyn ".to_string(),
            birthday: Some("1934-08-30".to_string()),
            is_active: false,
        };
        let (name, birthday) = payload.validate().unwrap();
        assert_eq!(name, "Anatoly Solonitsyn");
        assert_eq!(birthday.as_deref(), Some("1934-08-30"));
    }
}
