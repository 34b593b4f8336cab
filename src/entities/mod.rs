pub mod actor;
pub mod comment;
pub mod film;
pub mod film_actor;
pub mod film_genre;
pub mod genre;
pub mod user;
