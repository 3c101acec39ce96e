use serde::Serialize;

// Body returned by the creation endpoints
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

// Body returned for client-visible errors
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
