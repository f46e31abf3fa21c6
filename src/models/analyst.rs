use serde::{Deserialize, Serialize};

/// An analyst account as returned by the register endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analyst {
    pub id: i64,
    pub email: String,
}

/// The authenticated user as reported by `GET /secure-endpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}
