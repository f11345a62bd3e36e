//! Current-user identity and connectivity.
//!
//! Credential issuance and session storage live outside this crate. The
//! core only consumes [`IdentityProvider`]: who is signed in, whether they
//! are authenticated, and whether the network is reachable.
//! [`SessionIdentity`] is the in-process implementation used by the binary
//! and the tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::error::LedgerError;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    /// Local user id; partitions the record store.
    pub id: String,
    /// Stable identifier used by the remote store, linked once.
    pub remote_id: Option<String>,
}

impl UserIdentity {
    /// Id that partitions the remote store: the linked remote id, or the
    /// local id when none was linked.
    #[must_use]
    pub fn remote_owner_id(&self) -> &str {
        self.remote_id.as_deref().unwrap_or(&self.id)
    }
}

/// Source of the current user and connectivity status.
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Whether a user is signed in.
    fn is_authenticated(&self) -> bool;

    /// Whether the remote store is believed reachable.
    fn is_online(&self) -> bool;

    /// Local id of the signed-in user.
    fn current_user_id(&self) -> Option<String>;

    /// Full identity of the signed-in user.
    fn current_user(&self) -> Option<UserIdentity>;

    /// Resolves the current user id or fails.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when nobody is signed in.
    fn require_user_id(&self) -> Result<String, LedgerError> {
        self.current_user_id().ok_or(LedgerError::NotAuthenticated)
    }
}

/// In-memory identity for one device session.
#[derive(Debug)]
pub struct SessionIdentity {
    user: RwLock<Option<UserIdentity>>,
    online: AtomicBool,
}

impl SessionIdentity {
    /// Creates a signed-out identity with the given connectivity.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            user: RwLock::new(None),
            online: AtomicBool::new(online),
        }
    }

    /// Creates an identity already signed in as `user_id`.
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>, online: bool) -> Self {
        let identity = Self::new(online);
        identity.sign_in(user_id);
        identity
    }

    /// Signs in as `user_id`, replacing any previous user.
    pub fn sign_in(&self, user_id: impl Into<String>) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        *user = Some(UserIdentity {
            id: user_id.into(),
            remote_id: None,
        });
    }

    /// Signs out.
    pub fn sign_out(&self) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        *user = None;
    }

    /// Updates connectivity, returning the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }

    /// Links the foreign identity used by the remote store.
    ///
    /// The mapping is immutable: linking the same id again is a no-op,
    /// linking a different one is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when nobody is signed in,
    /// or [`LedgerError::Validation`] when a different remote id is
    /// already linked.
    pub fn link_remote_id(&self, remote_id: impl Into<String>) -> Result<(), LedgerError> {
        let remote_id = remote_id.into();
        let mut guard = self.user.write().unwrap_or_else(PoisonError::into_inner);
        let user = guard.as_mut().ok_or(LedgerError::NotAuthenticated)?;
        if let Some(existing) = &user.remote_id {
            if *existing == remote_id {
                return Ok(());
            }
            return Err(LedgerError::Validation(format!(
                "user {} is already linked to remote id {existing}",
                user.id
            )));
        }
        tracing::info!(user_id = %user.id, %remote_id, "linked remote identity");
        user.remote_id = Some(remote_id);
        Ok(())
    }
}

impl IdentityProvider for SessionIdentity {
    fn is_authenticated(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn current_user_id(&self) -> Option<String> {
        self.current_user().map(|user| user.id)
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn signed_out_identity_has_no_user() {
        let identity = SessionIdentity::new(true);
        assert!(!identity.is_authenticated());
        assert!(matches!(
            identity.require_user_id(),
            Err(LedgerError::NotAuthenticated)
        ));
    }

    #[test]
    fn sign_in_and_out() {
        let identity = SessionIdentity::new(false);
        identity.sign_in("u1");
        assert_eq!(identity.current_user_id().as_deref(), Some("u1"));
        identity.sign_out();
        assert!(identity.current_user().is_none());
    }

    #[test]
    fn remote_owner_falls_back_to_local_id() {
        let identity = SessionIdentity::signed_in("u1", true);
        let Some(user) = identity.current_user() else {
            panic!("signed in");
        };
        assert_eq!(user.remote_owner_id(), "u1");
    }

    #[test]
    fn remote_link_is_immutable() {
        let identity = SessionIdentity::signed_in("u1", true);
        assert!(identity.link_remote_id("r-9").is_ok());
        assert!(identity.link_remote_id("r-9").is_ok());
        assert!(matches!(
            identity.link_remote_id("r-10"),
            Err(LedgerError::Validation(_))
        ));
        let user = identity.current_user();
        assert_eq!(
            user.as_ref().map(UserIdentity::remote_owner_id),
            Some("r-9")
        );
    }

    #[test]
    fn set_online_reports_previous_state() {
        let identity = SessionIdentity::new(false);
        assert!(!identity.set_online(true));
        assert!(identity.is_online());
    }
}
