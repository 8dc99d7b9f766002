pub mod clock;
pub mod identity_service;
pub mod markdown;
pub mod password;
pub mod post_service;
pub mod settings_service;
pub mod upload_service;
