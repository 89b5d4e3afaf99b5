//! Profiles of signed-in users.

use crate::auth::Identity;
use crate::error::RsvpError;
use crate::types::{User, UserId};
use rsvp_core::Backend;
use rsvp_core::backend::ProfileChanges;
use rsvp_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Edits to a profile.
///
/// `name` and `email` keep their stored value when absent. `avatar` is
/// always written; `None` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// New contact email
    #[serde(default)]
    pub email: Option<String>,
    /// New avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Profile reads and edits.
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    /// Create the service; `clock` stamps `updated_at`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// The caller's profile, or one built from their session claims when no
    /// row exists or the lookup fails.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn current_user(&self, identity: &Identity) -> User {
        match self.backend.find_profile(identity.user_id).await {
            Ok(Some(profile)) => User::from(profile),
            Ok(None) => {
                tracing::debug!("No profile row, using session claims");
                fallback_user(identity)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed, using session claims");
                fallback_user(identity)
            },
        }
    }

    /// Apply `update` to the profile of `user_id`.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Validation`] for a blank name or email
    /// - [`RsvpError::ProfileNotFound`] if the user has no profile row
    /// - [`RsvpError::Persistence`] if the backend fails
    #[tracing::instrument(skip(self, update), fields(%user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RsvpError> {
        let name = update
            .name
            .as_deref()
            .map(|name| non_blank("name", "Name", name))
            .transpose()?;
        let email = update
            .email
            .as_deref()
            .map(|email| non_blank("email", "Email", email))
            .transpose()?;

        let current = self
            .backend
            .find_profile(user_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load profile"))?
            .ok_or(RsvpError::ProfileNotFound(user_id))?;

        let changes = ProfileChanges {
            name: name.unwrap_or(current.name),
            email: email.unwrap_or(current.email),
            avatar: update
                .avatar
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            updated_at: self.clock.now(),
        };

        let updated = self
            .backend
            .update_profile(user_id, changes)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to update profile"))?
            .ok_or(RsvpError::ProfileNotFound(user_id))?;

        tracing::info!("Profile updated");
        Ok(User::from(updated))
    }
}

fn fallback_user(identity: &Identity) -> User {
    User {
        id: identity.user_id,
        name: identity.name.clone().unwrap_or_else(|| "User".to_string()),
        email: identity.email.clone().unwrap_or_default(),
        avatar: identity.avatar_url.clone(),
    }
}

fn non_blank(field: &'static str, label: &str, value: &str) -> Result<String, RsvpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RsvpError::validation(field, format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rsvp_core::BackendError;
    use rsvp_testing::{BackendOp, InMemoryBackend, test_clock};

    fn setup() -> (Arc<InMemoryBackend>, ProfileService) {
        let backend = Arc::new(InMemoryBackend::new());
        let service = ProfileService::new(backend.clone(), Arc::new(test_clock()));
        (backend, service)
    }

    fn identity(user_id: UserId) -> Identity {
        Identity {
            user_id,
            email: Some("newcomer@example.com".to_string()),
            name: None,
            avatar_url: Some("https://example.com/a.png".to_string()),
        }
    }

    #[tokio::test]
    async fn current_user_reads_profile() {
        let (backend, service) = setup();
        let alice = backend.add_profile("Alice");

        let user = service.current_user(&identity(alice)).await;

        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn current_user_falls_back_to_claims() {
        let (backend, service) = setup();
        let newcomer = UserId::new();

        let user = service.current_user(&identity(newcomer)).await;
        assert_eq!(user.name, "User");
        assert_eq!(user.email, "newcomer@example.com");
        assert_eq!(user.avatar.as_deref(), Some("https://example.com/a.png"));

        let alice = backend.add_profile("Alice");
        backend.fail_on(BackendOp::FindProfile, BackendError::Connection("refused".to_string()));
        let user = service.current_user(&identity(alice)).await;
        assert_eq!(user.name, "User");
    }

    #[tokio::test]
    async fn update_is_partial_and_stamped() {
        let (backend, service) = setup();
        let alice = backend.add_profile("Alice");

        let user = service
            .update_profile(
                alice,
                ProfileUpdate {
                    name: Some("  Alice Liddell ".to_string()),
                    email: None,
                    avatar: Some("https://example.com/alice.png".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(user.name, "Alice Liddell");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.avatar.as_deref(), Some("https://example.com/alice.png"));

        let cleared = service
            .update_profile(alice, ProfileUpdate::default())
            .await
            .unwrap();
        assert_eq!(cleared.avatar, None);
        assert_eq!(cleared.name, "Alice Liddell");
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_backend() {
        let (backend, service) = setup();
        let alice = backend.add_profile("Alice");

        let result = service
            .update_profile(
                alice,
                ProfileUpdate {
                    name: Some("   ".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await;

        assert!(matches!(result, Err(RsvpError::Validation { field: "name", .. })));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let (_, service) = setup();
        let ghost = UserId::new();

        let result = service.update_profile(ghost, ProfileUpdate::default()).await;

        assert_eq!(result, Err(RsvpError::ProfileNotFound(ghost)));
    }
}
