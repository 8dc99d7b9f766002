use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side record backing a login. Deleting it revokes the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Claims carried by the signed session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// subject / user id
    pub sub: i32,
    /// session id registered in the session table
    pub sid: Uuid,
    pub iat: usize,
    pub exp: usize,
}
