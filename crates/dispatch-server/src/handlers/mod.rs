pub mod health;
pub mod query;
pub mod stream;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}
