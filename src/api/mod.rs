//! REST API boundary
//!
//! All HTTP traffic goes through [`ApiClient`]. The rest of the crate only
//! sees the [`SchoolApi`] trait, typed records and [`ApiError`].

pub mod client;
pub mod envelope;
pub mod errors;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use std::path::Path;

use crate::models::{FormData, Record, Resource, User};

pub use client::ApiClient;
pub use envelope::{decode_list, ListPage};
pub use errors::{extract_error_message, ApiError};

/// Operations the dashboards perform against the backend
#[async_trait]
pub trait SchoolApi: Send + Sync {
    /// Fetch a whole collection
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ApiError>;

    async fn get(&self, resource: Resource, id: i64) -> Result<Record, ApiError>;

    /// POST a new record; the server's echo is returned when it carries an id
    async fn create(&self, resource: Resource, form: &FormData) -> Result<Option<Record>, ApiError>;

    /// PUT an existing record
    async fn update(
        &self,
        resource: Resource,
        id: i64,
        form: &FormData,
    ) -> Result<Option<Record>, ApiError>;

    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError>;

    /// Multipart upload into the documents collection
    async fn upload_document(&self, title: &str, path: &Path) -> Result<Option<Record>, ApiError>;

    /// Exchange credentials for a token and establish the session
    async fn login(&self, username: &str, password: &str) -> Result<User, ApiError>;

    async fn current_user(&self) -> Result<User, ApiError>;
}
