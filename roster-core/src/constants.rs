//! Validation bounds and configuration defaults.

use std::time::Duration;

/// Oldest accepted age for a user record.
pub const MAX_USER_AGE: u8 = 120;

/// Longest accepted user name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// Longest accepted email address, in characters.
pub const MAX_EMAIL_LEN: usize = 320;

/// Default cache TTL when none is configured (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default HTTP port for the service.
pub const DEFAULT_SERVICE_PORT: u16 = 8080;
