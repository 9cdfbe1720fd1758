pub mod admin;
pub mod generation;
pub mod media;
pub mod points;
