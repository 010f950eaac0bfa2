//! # Roster Registry
//!
//! Record storage backends for roster.
//!
//! This crate provides two backing providers:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **File**: JSON file persisted after every write, for single-node deployments
//!
//! Both implement [`RecordProvider`](roster_core::RecordProvider) and report
//! missing keys as [`RosterError::NotFound`](roster_core::RosterError::NotFound).
//!
//! ## Example
//!
//! ```rust,ignore
//! use roster_core::{RecordProvider, User};
//! use roster_registry::MemoryStore;
//!
//! let store = MemoryStore::<User>::new();
//! let id = store.create(&user).await?;
//! let fetched = store.read(&id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// Re-export the trait from core
pub use roster_core::traits::RecordProvider as Provider;
