pub mod auth_dtos;
pub mod chat_dtos;
pub mod post_dtos;
pub mod settings_dtos;
pub mod upload_dtos;
