pub mod genre;
pub mod language;
pub mod movie;
pub mod order;
pub mod order_movie;
