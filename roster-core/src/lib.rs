//! # Roster Core
//!
//! Core types, errors, and traits shared by every roster crate.
//!
//! - **Types**: the user record, its identifier, and the create DTO
//! - **Errors**: a single error hierarchy with a distinguishable not-found case
//! - **Constants**: validation bounds and configuration defaults
//! - **Traits**: the keyed record contract implemented by storage backends and the cache
//!
//! ## Example
//!
//! ```rust
//! use roster_core::{Gender, NewUser, User, UserId};
//!
//! let new_user = NewUser {
//!     name: "Alice".into(),
//!     age: 30,
//!     gender: Gender::Female,
//!     email: "alice@example.com".into(),
//! };
//! new_user.validate().unwrap();
//!
//! let user = new_user.into_user(UserId::generate());
//! let json = serde_json::to_string(&user).unwrap();
//! assert!(json.contains("alice@example.com"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{CacheOp, Result, RosterError};
pub use traits::*;
pub use types::*;
