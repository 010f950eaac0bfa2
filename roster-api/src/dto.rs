//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use roster_core::types::UserId;

/// Response for user creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserResponse {
    /// Identifier assigned to the new user
    pub id: UserId,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Entries currently cached
    pub cached_entries: usize,
    /// Configured cache TTL in seconds
    pub cache_ttl_secs: u64,
}
