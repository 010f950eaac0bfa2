//! Domain types for roster.

mod user;

pub use user::{Gender, NewUser, User, UserId};
