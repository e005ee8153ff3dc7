use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Activation,
    Authentication,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Activation => "activation",
            Scope::Authentication => "authentication",
        }
    }
}

/// An issued token. Only `plaintext` and `expiry` ever leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip_serializing)]
    pub hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub scope: Scope,
}
