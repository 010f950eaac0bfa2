//! User use-case layer.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use roster_core::error::{Result, RosterError};
use roster_core::traits::RecordProvider;
use roster_core::types::{NewUser, User, UserId};

/// Validates input and forwards user operations to a provider.
///
/// Normally the provider is the cache, so the service never needs to know
/// whether a read was answered from memory. Every outcome is logged:
/// caller mistakes (missing, duplicate or invalid users) at warn, anything
/// else at error.
#[derive(Clone)]
pub struct UserService {
    provider: Arc<dyn RecordProvider<User>>,
}

impl UserService {
    /// Creates a service over `provider`.
    pub fn new(provider: Arc<dyn RecordProvider<User>>) -> Self {
        Self { provider }
    }

    /// Assigns a fresh id and stores the user.
    #[instrument(skip_all)]
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserId> {
        new_user
            .validate()
            .inspect_err(|e| log_failure("create user", e))?;
        let user = new_user.into_user(UserId::generate());
        let id = self
            .provider
            .create(&user)
            .await
            .inspect_err(|e| log_failure("create user", e))?;
        info!(%id, "Created user");
        Ok(id)
    }

    /// Fetches a user by id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<User> {
        let user = self
            .provider
            .read(&id)
            .await
            .inspect_err(|e| log_failure("fetch user", e))?;
        info!("Fetched user");
        Ok(user)
    }

    /// Replaces an existing user.
    #[instrument(skip_all, fields(id = %user.id))]
    pub async fn update_user(&self, user: User) -> Result<()> {
        user.validate()
            .inspect_err(|e| log_failure("update user", e))?;
        self.provider
            .update(&user)
            .await
            .inspect_err(|e| log_failure("update user", e))?;
        info!("Updated user");
        Ok(())
    }

    /// Removes a user.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        self.provider
            .delete(&id)
            .await
            .inspect_err(|e| log_failure("delete user", e))?;
        info!("Deleted user");
        Ok(())
    }
}

fn log_failure(action: &str, err: &RosterError) {
    if err.is_not_found() || err.is_conflict() || err.is_validation_error() {
        warn!(error = %err, "Failed to {}", action);
    } else {
        error!(error = %err, "Failed to {}", action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use roster_core::types::Gender;
    use roster_registry::MemoryStore;

    /// Shared buffer that a test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::<User>::new()))
    }

    fn new_user(name: &str, age: u8) -> NewUser {
        NewUser {
            name: name.into(),
            age,
            gender: Gender::Female,
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let users = service();
        let id = users.create_user(new_user("Alice", 30)).await.unwrap();

        let user = users.get_user(id).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "Alice");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let users = service();
        let err = users.create_user(new_user("", 30)).await.unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let users = service();
        let id = users.create_user(new_user("Bob", 40)).await.unwrap();

        let mut user = users.get_user(id).await.unwrap();
        user.age = 41;
        users.update_user(user).await.unwrap();
        assert_eq!(users.get_user(id).await.unwrap().age, 41);

        users.delete_user(id).await.unwrap();
        assert!(users.get_user(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_rejects_nil_id() {
        let users = service();
        let user = new_user("Carol", 22).into_user(UserId::nil());
        assert!(users.update_user(user).await.unwrap_err().is_validation_error());
    }

    #[tokio::test]
    async fn test_every_outcome_is_logged() {
        let users = service();
        let (logs, _guard) = capture_logs();

        let id = users.create_user(new_user("Dave", 50)).await.unwrap();
        users.get_user(id).await.unwrap();
        assert!(users.get_user(UserId::generate()).await.is_err());
        assert!(users.create_user(new_user("", 50)).await.is_err());
        assert!(users.delete_user(UserId::generate()).await.is_err());

        let out = logs.contents();
        assert!(out.contains("Created user"));
        assert!(out.contains("Fetched user"));
        assert!(out.contains("Failed to fetch user"));
        assert!(out.contains("Failed to create user"));
        assert!(out.contains("Failed to delete user"));
        assert!(out.contains("WARN"));
        assert!(!out.contains("ERROR"));
    }

    #[tokio::test]
    async fn test_store_failures_logged_as_errors() {
        struct BrokenStore;

        #[async_trait::async_trait]
        impl RecordProvider<User> for BrokenStore {
            async fn create(&self, _: &User) -> Result<UserId> {
                Err(RosterError::Storage("disk full".into()))
            }
            async fn read(&self, _: &UserId) -> Result<User> {
                Err(RosterError::Storage("disk full".into()))
            }
            async fn update(&self, _: &User) -> Result<()> {
                Err(RosterError::Storage("disk full".into()))
            }
            async fn delete(&self, _: &UserId) -> Result<()> {
                Err(RosterError::Storage("disk full".into()))
            }
        }

        let users = UserService::new(Arc::new(BrokenStore));
        let (logs, _guard) = capture_logs();

        assert!(users.create_user(new_user("Erin", 33)).await.is_err());

        let out = logs.contents();
        assert!(out.contains("ERROR"));
        assert!(out.contains("disk full"));
    }
}
