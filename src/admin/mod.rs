pub mod auth;
pub mod form;
pub mod screen;

pub use form::Form;
pub use screen::{BannerKind, ListScreen};
