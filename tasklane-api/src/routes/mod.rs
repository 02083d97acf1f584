/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and admin login
/// - `tasks`: The caller's own tasks
/// - `admin`: Statistics and cross-user management (admin token only)

pub mod admin;
pub mod auth;
pub mod health;
pub mod tasks;

use serde::{Deserialize, Serialize};

/// List envelope: `{"data": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

impl<T> From<Vec<T>> for DataResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Plain confirmation: `{"message": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
