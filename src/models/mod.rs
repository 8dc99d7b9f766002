pub mod post;
pub mod session;
pub mod settings;
pub mod user;
