//! User records and identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_USER_AGE};
use crate::error::{Result, RosterError};
use crate::traits::Record;

/// Unique user identifier (UUID).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The nil identifier, never assigned to a stored user.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true for the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| RosterError::Validation(format!("invalid user id '{}': {}", s, e)))
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// User gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// male
    Male,
    /// female
    Female,
}

/// A stored user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Age in years
    pub age: u8,
    /// Gender
    pub gender: Gender,
    /// Contact email
    pub email: String,
}

impl User {
    /// Validates every field, including the identifier.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_nil() {
            return Err(RosterError::Validation("id is required".into()));
        }
        validate_fields(&self.name, self.age, &self.email)
    }
}

impl Record for User {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }
}

/// Fields required to create a user; the id is assigned by the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Age in years
    pub age: u8,
    /// Gender
    pub gender: Gender,
    /// Contact email
    pub email: String,
}

impl NewUser {
    /// Validates the supplied fields.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.name, self.age, &self.email)
    }

    /// Builds the full record under the given id.
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            email: self.email,
        }
    }
}

fn validate_fields(name: &str, age: u8, email: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RosterError::Validation("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RosterError::Validation(format!(
            "name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    if age > MAX_USER_AGE {
        return Err(RosterError::Validation(format!(
            "age must be between 0 and {}, got {}",
            MAX_USER_AGE, age
        )));
    }
    if !is_plausible_email(email) {
        return Err(RosterError::Validation(format!("invalid email: '{}'", email)));
    }
    Ok(())
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn alice() -> NewUser {
        NewUser {
            name: "Alice".into(),
            age: 30,
            gender: Gender::Female,
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn test_new_user_valid() {
        assert!(alice().validate().is_ok());
    }

    #[test]
    fn test_into_user_keeps_fields() {
        let id = UserId::generate();
        let user = alice().into_user(id);
        assert_eq!(user.key(), id);
        assert_eq!(user.name, "Alice");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_nil_id_rejected() {
        let user = alice().into_user(UserId::nil());
        assert!(user.validate().unwrap_err().is_validation_error());
    }

    #[test_case("" ; "empty")]
    #[test_case("alice" ; "no at")]
    #[test_case("@example.com" ; "no local part")]
    #[test_case("alice@localhost" ; "no dot")]
    #[test_case("alice@@example.com" ; "double at")]
    #[test_case("al ice@example.com" ; "whitespace")]
    fn test_invalid_email(email: &str) {
        let mut user = alice();
        user.email = email.into();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut user = alice();
        user.name = "   ".into();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_gender_serde() {
        let json = serde_json::to_string(&Gender::Male).unwrap();
        assert_eq!(json, "\"male\"");
        assert!(serde_json::from_str::<Gender>("\"other\"").is_err());
    }

    #[test]
    fn test_user_id_parse() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    proptest! {
        #[test]
        fn prop_age_bound(age in any::<u8>()) {
            let mut user = alice();
            user.age = age;
            prop_assert_eq!(user.validate().is_ok(), age <= MAX_USER_AGE);
        }
    }
}
