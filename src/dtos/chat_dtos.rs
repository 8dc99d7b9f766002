use serde::{Deserialize, Serialize};

use crate::models::user::UserPublic;

#[derive(Deserialize)]
pub struct ChatIn {
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatPage {
    pub current_user: UserPublic,
    pub message: Option<String>,
    pub reply: Option<String>,
}
