//! Credential verification and account management for Solera.
//!
//! `AuthManager` is the only place that compares a submitted credential
//! against the stored record. Authentication failures of every kind
//! (unknown user, wrong password, inactive account, store errors)
//! normalize to `None` so a caller cannot tell them apart.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::hasher::{PasswordError, PasswordHasher};
use crate::auth::permission::{role_allows, AccessLevel};
use crate::auth::validation::{
    validate_strength, validate_username, StrengthIssue, StrengthPolicy, ValidationError,
};
use crate::db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
use crate::Result;

/// Errors from user creation.
#[derive(Error, Debug)]
pub enum CreateUserError {
    /// Username validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Password does not satisfy the strength policy.
    #[error("weak password: {}", format_issues(.0))]
    WeakPassword(Vec<StrengthIssue>),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Errors from password change operations.
#[derive(Error, Debug)]
pub enum PasswordChangeError {
    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// The supplied current password is wrong.
    #[error("current password is incorrect")]
    WrongPassword,

    /// New password does not satisfy the strength policy.
    #[error("weak password: {}", format_issues(.0))]
    WeakPassword(Vec<StrengthIssue>),

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

fn format_issues(issues: &[StrengthIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sanitized user information handed to the UI layer.
///
/// Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Login username.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// User role.
    pub role: Role,
    /// Last login timestamp (optional).
    pub last_login: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role,
            last_login: user.last_login.clone(),
        }
    }
}

/// Request data for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    /// Desired username.
    pub username: String,
    /// Plaintext password (hashed before storage).
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Role for the new account.
    pub role: Role,
}

impl CreateUserRequest {
    /// Create a request with the minimal required fields.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: display_name.into(),
            email: None,
            role: Role::Basico,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Authentication manager holding the current session fields.
///
/// Two states: unauthenticated (initial) and authenticated. The only
/// transitions are a successful [`AuthManager::authenticate`] call and
/// [`AuthManager::logout`]. Timeout handling lives in
/// [`crate::auth::SecurityManager`], not here.
pub struct AuthManager {
    db: Database,
    hasher: PasswordHasher,
    policy: StrengthPolicy,
    current: Option<UserInfo>,
}

impl AuthManager {
    /// Create an unauthenticated manager over the given database.
    pub fn new(db: Database, hasher: PasswordHasher, policy: StrengthPolicy) -> Self {
        Self {
            db,
            hasher,
            policy,
            current: None,
        }
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Authenticate a username/password pair.
    ///
    /// Returns the sanitized user info on success. Every failure mode
    /// returns `None`; nothing is raised and the cause is not
    /// distinguishable from the result.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Option<UserInfo> {
        let repo = UserRepository::new(&self.db);

        let user = match repo.get_active_by_username(username) {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(username = %username, "Authentication failed: no matching active user");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed: user lookup error");
                return None;
            }
        };

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                debug!(username = %username, "Authentication failed: wrong password");
                return None;
            }
            Err(e) => {
                warn!(username = %username, error = %e, "Authentication failed: verify error");
                return None;
            }
        }

        // Opportunistic upgrade of legacy or under-cost hashes
        if self.hasher.needs_rehash(&user.password_hash) {
            match self.hasher.hash(password) {
                Ok(new_hash) => {
                    if let Err(e) = repo.set_password_hash(user.id, &new_hash) {
                        warn!(user_id = user.id, error = %e, "Failed to upgrade password hash");
                    } else {
                        info!(user_id = user.id, "Password hash upgraded");
                    }
                }
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "Failed to rehash password");
                }
            }
        }

        if let Err(e) = repo.update_last_login(user.id) {
            warn!(user_id = user.id, error = %e, "Failed to update last login");
        }

        let info = UserInfo::from(&user);
        self.current = Some(info.clone());

        info!(
            username = %info.username,
            user_id = info.id,
            role = %info.role,
            "Authentication successful"
        );

        Some(info)
    }

    /// Clear the session fields. Safe to call when already logged out.
    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            info!(username = %user.username, user_id = user.id, "Logged out");
        }
    }

    /// Whether a user is currently authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// The currently authenticated user, if any.
    pub fn current_user(&self) -> Option<&UserInfo> {
        self.current.as_ref()
    }

    /// The current user's role, if authenticated.
    pub fn current_role(&self) -> Option<Role> {
        self.current.as_ref().map(|u| u.role)
    }

    /// Coarse role-based permission check, independent of the per-module
    /// lists in [`crate::auth::SecurityManager`]: Admin may do anything,
    /// Supervisor may read and write, everyone else may only read.
    pub fn has_permission(&self, level: AccessLevel) -> bool {
        match &self.current {
            Some(user) => role_allows(user.role, level),
            None => false,
        }
    }

    /// Create a new user account.
    ///
    /// The username must not exist (exact match) and the password must
    /// satisfy the strength policy. The returned structure never
    /// contains the password hash.
    pub fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> std::result::Result<UserInfo, CreateUserError> {
        validate_username(&request.username)?;
        validate_strength(&request.password, &self.policy)
            .map_err(CreateUserError::WeakPassword)?;

        let repo = UserRepository::new(&self.db);
        if repo
            .username_exists(&request.username)
            .map_err(|e| CreateUserError::Database(e.to_string()))?
        {
            return Err(CreateUserError::UsernameExists);
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let mut new_user = NewUser::new(&request.username, &password_hash, &request.display_name)
            .with_role(request.role);
        if let Some(ref email) = request.email {
            new_user = new_user.with_email(email);
        }

        let user = repo
            .create(&new_user)
            .map_err(|e| CreateUserError::Database(e.to_string()))?;

        info!(
            username = %user.username,
            user_id = user.id,
            role = %user.role,
            "User created"
        );

        Ok(UserInfo::from(&user))
    }

    /// Overwrite a user's password without checking the old one.
    ///
    /// Administrative reset flow; the caller is responsible for having
    /// authorized the operation.
    pub fn admin_reset_password(
        &self,
        user_id: i64,
        new_password: &str,
    ) -> std::result::Result<(), PasswordChangeError> {
        let repo = UserRepository::new(&self.db);
        repo.get_by_id(user_id)
            .map_err(|e| PasswordChangeError::Database(e.to_string()))?
            .ok_or(PasswordChangeError::UserNotFound)?;

        self.store_new_password(user_id, new_password)?;
        info!(user_id = user_id, "Password reset by administrator");
        Ok(())
    }

    /// Change a user's password after verifying the current one.
    pub fn self_change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> std::result::Result<(), PasswordChangeError> {
        let repo = UserRepository::new(&self.db);
        let user = repo
            .get_by_id(user_id)
            .map_err(|e| PasswordChangeError::Database(e.to_string()))?
            .ok_or(PasswordChangeError::UserNotFound)?;

        match self.hasher.verify(current_password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(PasswordChangeError::WrongPassword),
            Err(e) => return Err(PasswordChangeError::Password(e)),
        }

        self.store_new_password(user_id, new_password)?;
        info!(user_id = user_id, "Password changed");
        Ok(())
    }

    fn store_new_password(
        &self,
        user_id: i64,
        new_password: &str,
    ) -> std::result::Result<(), PasswordChangeError> {
        validate_strength(new_password, &self.policy)
            .map_err(PasswordChangeError::WeakPassword)?;

        let hash = self.hasher.hash(new_password)?;

        let repo = UserRepository::new(&self.db);
        let updated = repo
            .set_password_hash(user_id, &hash)
            .map_err(|e| PasswordChangeError::Database(e.to_string()))?;
        if !updated {
            return Err(PasswordChangeError::UserNotFound);
        }
        Ok(())
    }

    /// Apply a field-wise update to a user.
    ///
    /// Only the fields of [`UserUpdate`] can be touched; each one runs
    /// its own fixed statement.
    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<Option<UserInfo>> {
        let repo = UserRepository::new(&self.db);
        let updated = repo.apply_update(user_id, update)?;

        if let Some(ref user) = updated {
            info!(user_id = user.id, username = %user.username, "User updated");
        }

        Ok(updated.as_ref().map(UserInfo::from))
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("authenticated", &self.current.is_some())
            .finish()
    }
}
