use serde::{Deserialize, Serialize};

use crate::models::user::UserPublic;

/// Body of `POST /login` (form-encoded).
#[derive(Deserialize)]
pub struct LoginIn {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginPage {
    pub notice: Option<String>,
    pub current_user: Option<UserPublic>,
}
