//! Session context: the current identity and whether it is an administrator.
//!
//! [`Session`] is an immutable snapshot handed to each workflow call.
//! [`SessionContext`] holds the live value and lets interested parties observe
//! sign-in and sign-out transitions.

use std::collections::HashSet;

use elecdocs_core::{AppError, Identity};
use tokio::sync::watch;

/// Static set of administrator emails, compared case-insensitively after trimming.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        identity
            .email
            .as_deref()
            .map(|email| self.contains(email))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    is_admin: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity, admins: &AdminAllowList) -> Self {
        let is_admin = admins.is_admin(&identity);
        Self {
            identity: Some(identity),
            is_admin,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// False whenever there is no identity.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// The identity, or `Unauthenticated` carrying `message`.
    pub fn require_identity(&self, message: &str) -> Result<&Identity, AppError> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::Unauthenticated(message.to_string()))
    }
}

/// Change pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}

/// Observable holder of the current [`Session`].
pub struct SessionContext {
    admins: AdminAllowList,
    sender: watch::Sender<Session>,
}

impl SessionContext {
    pub fn new(admins: AdminAllowList) -> Self {
        let (sender, _) = watch::channel(Session::anonymous());
        Self { admins, sender }
    }

    pub fn current(&self) -> Session {
        self.sender.borrow().clone()
    }

    /// Apply an auth transition and notify subscribers.
    pub fn apply(&self, event: AuthEvent) {
        let session = match event {
            AuthEvent::SignedIn(identity) => Session::signed_in(identity, &self.admins),
            AuthEvent::SignedOut => Session::anonymous(),
        };
        tracing::debug!(
            authenticated = session.is_authenticated(),
            is_admin = session.is_admin(),
            "Session changed"
        );
        self.sender.send_replace(session);
    }

    pub fn sign_in(&self, identity: Identity) {
        self.apply(AuthEvent::SignedIn(identity));
    }

    pub fn sign_out(&self) {
        self.apply(AuthEvent::SignedOut);
    }

    /// Observe transitions. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct SessionSubscription {
    receiver: watch::Receiver<Session>,
}

impl SessionSubscription {
    /// Wait for the next transition. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn current(&self) -> Session {
        self.receiver.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("u1", Some("Alice@Example.com".to_string()))
    }

    #[test]
    fn test_admin_allow_list_is_case_insensitive() {
        let admins = AdminAllowList::new([" alice@example.com "]);
        assert!(admins.contains("ALICE@example.com"));
        assert!(admins.is_admin(&alice()));
        assert!(!admins.is_admin(&Identity::new("u2", None)));
        assert!(!admins.contains("bob@example.com"));
    }

    #[test]
    fn test_anonymous_session_is_never_admin() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
        let err = session.require_identity("Please log in to view files").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(ref m) if m == "Please log in to view files"));
    }

    #[test]
    fn test_signed_in_session() {
        let admins = AdminAllowList::new(["alice@example.com"]);
        let session = Session::signed_in(alice(), &admins);
        assert!(session.is_admin());
        assert_eq!(session.require_identity("x").unwrap().uid, "u1");

        let session = Session::signed_in(Identity::new("u3", Some("carol@example.com".into())), &admins);
        assert!(session.is_authenticated());
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let context = SessionContext::new(AdminAllowList::new(["alice@example.com"]));
        let mut subscription = context.subscribe();
        assert!(!subscription.current().is_authenticated());

        context.sign_in(alice());
        let session = subscription.changed().await.unwrap();
        assert!(session.is_admin());
        assert_eq!(context.current(), session);

        context.apply(AuthEvent::SignedOut);
        let session = subscription.changed().await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let context = SessionContext::new(AdminAllowList::default());
        let first = context.subscribe();
        let second = context.subscribe();
        assert_eq!(context.subscriber_count(), 2);

        drop(first);
        assert_eq!(context.subscriber_count(), 1);
        drop(second);
        assert_eq!(context.subscriber_count(), 0);

        // Transitions with no subscribers are still recorded.
        context.sign_in(alice());
        assert!(context.current().is_authenticated());
    }

    #[tokio::test]
    async fn test_subscription_ends_with_context() {
        let context = SessionContext::new(AdminAllowList::default());
        let mut subscription = context.subscribe();
        drop(context);
        assert!(subscription.changed().await.is_none());
    }
}
