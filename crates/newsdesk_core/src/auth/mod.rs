//! Authentication contract and local editor provider.
//!
//! # Responsibility
//! - Define sign-in/sign-out and the "current user changed" notification.
//! - Provide an allow-list provider for local editors.
//!
//! # Invariants
//! - A new listener is called once with the current state on subscribe.
//! - Dropping an `AuthSubscription` stops further listener calls.
//! - Listeners are never called while provider state is locked.

use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type AuthResult<T> = Result<T, AuthError>;

/// Callback invoked with the signed-in user, or `None` after sign-out.
pub type AuthListener = Box<dyn Fn(Option<&AuthUser>) + Send + Sync>;

/// Signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidAccount(String),
    AccessDenied(String),
    Unavailable(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAccount(value) => write!(f, "invalid account: `{value}`"),
            Self::AccessDenied(value) => write!(f, "account is not an editor: `{value}`"),
            Self::Unavailable(message) => write!(f, "auth provider unavailable: {message}"),
        }
    }
}

impl Error for AuthError {}

/// Authentication subsystem consumed by the record client.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, account: &str) -> AuthResult<AuthUser>;
    fn sign_out(&self) -> AuthResult<()>;
    fn current_user(&self) -> Option<AuthUser>;
    /// Registers a listener for auth-state changes.
    fn subscribe(&self, listener: AuthListener) -> AuthSubscription;
}

/// Live listener registration; unsubscribes on drop.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct AuthSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthSubscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Subscription with nothing to release.
    pub fn detached() -> Self {
        Self { release: None }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Default)]
struct LocalAuthState {
    user: Option<AuthUser>,
    listeners: BTreeMap<u64, Arc<AuthListener>>,
    next_listener_id: u64,
}

/// In-process provider that signs in accounts from an editor allow-list.
#[derive(Clone)]
pub struct LocalAuthProvider {
    editors: Arc<BTreeSet<String>>,
    state: Arc<Mutex<LocalAuthState>>,
}

impl LocalAuthProvider {
    pub fn new<I, S>(editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let editors = editors
            .into_iter()
            .filter_map(|account| normalize_account(account.as_ref()))
            .collect();
        Self {
            editors: Arc::new(editors),
            state: Arc::new(Mutex::new(LocalAuthState::default())),
        }
    }

    pub fn is_editor(&self, account: &str) -> bool {
        normalize_account(account).is_some_and(|account| self.editors.contains(&account))
    }

    fn lock(&self) -> MutexGuard<'_, LocalAuthState> {
        lock_state(&self.state)
    }

    fn set_user(&self, user: Option<AuthUser>) {
        let listeners: Vec<Arc<AuthListener>> = {
            let mut state = self.lock();
            if state.user == user {
                return;
            }
            state.user = user.clone();
            state.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(user.as_ref());
        }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_in(&self, account: &str) -> AuthResult<AuthUser> {
        let account = normalize_account(account)
            .ok_or_else(|| AuthError::InvalidAccount(account.to_string()))?;
        if !self.editors.contains(&account) {
            warn!("event=auth_sign_in module=auth status=error error_code=access_denied");
            return Err(AuthError::AccessDenied(account));
        }

        let user = AuthUser { account };
        self.set_user(Some(user.clone()));
        info!("event=auth_sign_in module=auth status=ok");
        Ok(user)
    }

    fn sign_out(&self) -> AuthResult<()> {
        self.set_user(None);
        info!("event=auth_sign_out module=auth status=ok");
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.lock().user.clone()
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        let listener = Arc::new(listener);
        let (id, current) = {
            let mut state = self.lock();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, Arc::clone(&listener));
            (id, state.user.clone())
        };
        listener(current.as_ref());

        let weak: Weak<Mutex<LocalAuthState>> = Arc::downgrade(&self.state);
        AuthSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                lock_state(&state).listeners.remove(&id);
            }
        })
    }
}

fn lock_state(state: &Mutex<LocalAuthState>) -> MutexGuard<'_, LocalAuthState> {
    // A panicking listener never runs under the lock, so poisoned state is
    // still consistent.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn normalize_account(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthError, AuthProvider, LocalAuthProvider};
    use std::sync::{Arc, Mutex};

    #[test]
    fn sign_in_accepts_editor_case_insensitively() {
        let provider = LocalAuthProvider::new(["Editor@Example.com"]);
        let user = provider.sign_in(" editor@example.COM ").unwrap();
        assert_eq!(user.account, "editor@example.com");
        assert_eq!(provider.current_user(), Some(user));
    }

    #[test]
    fn sign_in_rejects_unknown_and_blank_accounts() {
        let provider = LocalAuthProvider::new(["editor@example.com"]);
        assert!(matches!(
            provider.sign_in("guest@example.com"),
            Err(AuthError::AccessDenied(_))
        ));
        assert!(matches!(
            provider.sign_in("   "),
            Err(AuthError::InvalidAccount(_))
        ));
        assert!(provider.current_user().is_none());
    }

    #[test]
    fn listener_sees_initial_state_changes_and_stops_after_drop() {
        let provider = LocalAuthProvider::new(["editor@example.com"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = provider.subscribe(Box::new(move |user| {
            sink.lock()
                .unwrap()
                .push(user.map(|user| user.account.clone()));
        }));

        provider.sign_in("editor@example.com").unwrap();
        provider.sign_in("editor@example.com").unwrap();
        provider.sign_out().unwrap();
        drop(subscription);
        provider.sign_in("editor@example.com").unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("editor@example.com".to_string()), None]
        );
    }
}
