//! Session and permission façade for Solera.
//!
//! `SecurityManager` wraps [`AuthManager`] with timeout-aware sessions,
//! the role→module permission cache, login-attempt limiting, and
//! security-event logging. The UI layer talks to this type only.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::hasher::{HashMethod, PasswordHasher};
use crate::auth::manager::{AuthManager, UserInfo};
use crate::auth::permission::{levels_for_role, modules_for_role, AccessLevel, Module};
use crate::auth::validation::StrengthPolicy;
use crate::config::{Config, SecurityConfig};
use crate::db::{AuditLog, Database, Role};
use crate::Result;

/// Default session timeout in seconds.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

/// Default failed login attempts before lockout.
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Default lockout duration in seconds.
pub const DEFAULT_LOCKOUT_SECS: u64 = 300;

/// An established session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The authenticated user.
    pub user: UserInfo,
    /// Opaque session identifier (UUID v4).
    pub token: String,
    /// When the session was established.
    pub started_at: DateTime<Utc>,
    /// Monotonic start instant, for timeout measurement.
    started: Instant,
}

impl Session {
    fn new(user: UserInfo) -> Self {
        Self {
            user,
            token: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Time elapsed since login.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the session has outlived the given timeout.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.elapsed() >= timeout
    }
}

/// Result of a login attempt rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Account is locked for the given remaining duration.
    Locked(Duration),
}

/// Login attempt rate limiter.
///
/// Tracks failed attempts per username and enforces a lockout after too
/// many failures inside the window.
#[derive(Debug)]
pub struct LoginLimiter {
    attempts: HashMap<String, Vec<Instant>>,
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl LoginLimiter {
    /// Create a limiter with the given settings.
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts,
            window: lockout,
            lockout,
        }
    }

    /// Check if a login attempt is allowed for the given username.
    pub fn check(&mut self, username: &str) -> LimitResult {
        let now = Instant::now();
        let attempts = self.attempts.entry(username.to_lowercase()).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);

        if attempts.len() >= self.max_attempts as usize {
            if let Some(oldest) = attempts.first() {
                let elapsed = now.duration_since(*oldest);
                if elapsed < self.lockout {
                    return LimitResult::Locked(self.lockout - elapsed);
                }
                attempts.clear();
            }
        }

        LimitResult::Allowed
    }

    /// Record a failed login attempt.
    pub fn record_failure(&mut self, username: &str) {
        let now = Instant::now();
        let attempts = self.attempts.entry(username.to_lowercase()).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);
        attempts.push(now);

        debug!(
            username = %username,
            attempt_count = attempts.len(),
            "Recorded failed login attempt"
        );
    }

    /// Clear all attempts for a username (call on successful login).
    pub fn clear(&mut self, username: &str) {
        self.attempts.remove(&username.to_lowercase());
    }
}

/// Security façade used by the UI layer.
pub struct SecurityManager {
    auth: AuthManager,
    session: Option<Session>,
    permissions: HashMap<Module, &'static [AccessLevel]>,
    timeout: Duration,
    limiter: LoginLimiter,
}

impl SecurityManager {
    /// Create a manager over the given AuthManager using the configured
    /// timeout and lockout settings.
    pub fn new(auth: AuthManager, config: &SecurityConfig) -> Self {
        Self {
            auth,
            session: None,
            permissions: HashMap::new(),
            timeout: Duration::from_secs(config.session_timeout_secs),
            limiter: LoginLimiter::new(
                config.max_login_attempts,
                Duration::from_secs(config.lockout_secs),
            ),
        }
    }

    /// Create a manager with default settings.
    pub fn with_defaults(auth: AuthManager) -> Self {
        Self::new(auth, &SecurityConfig::default())
    }

    /// Build the full stack from configuration: open the database and
    /// wire the hasher, strength policy and session settings.
    ///
    /// Configuration is read once here; the result lives for the
    /// process lifetime and is passed to whatever needs it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path)?;
        let hasher = PasswordHasher::new(HashMethod::from_config(&config.security.hash_method));
        let policy = StrengthPolicy::with_min_length(config.security.min_password_length);
        let auth = AuthManager::new(db, hasher, policy);
        Ok(Self::new(auth, &config.security))
    }

    /// The wrapped AuthManager.
    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Mutable access to the wrapped AuthManager.
    pub fn auth_mut(&mut self) -> &mut AuthManager {
        &mut self.auth
    }

    /// The current session, if one is established.
    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Attempt to log a user in.
    ///
    /// The caller learns only success or failure; the cause of a failure
    /// is recorded in the event log, not in the return value.
    pub fn login(&mut self, username: &str, password: &str) -> bool {
        if let LimitResult::Locked(remaining) = self.limiter.check(username) {
            warn!(
                username = %username,
                remaining_secs = remaining.as_secs(),
                "Login blocked: too many failed attempts"
            );
            self.log_security_event(
                None,
                "login_blocked",
                None,
                &format!("usuario {username}: bloqueado {}s", remaining.as_secs()),
            );
            return false;
        }

        match self.auth.authenticate(username, password) {
            Some(user) => {
                self.limiter.clear(username);
                self.permissions = derive_permissions(user.role);

                let session = Session::new(user);
                info!(
                    username = %session.user.username,
                    user_id = session.user.id,
                    token = %session.token,
                    "Session established"
                );
                self.log_security_event(
                    Some(session.user.id),
                    "login_success",
                    None,
                    &format!("sesión {}", session.token),
                );
                self.session = Some(session);
                true
            }
            None => {
                self.limiter.record_failure(username);
                self.log_security_event(
                    None,
                    "login_failed",
                    None,
                    &format!("intento fallido para {username}"),
                );
                false
            }
        }
    }

    /// End the current session.
    ///
    /// Returns false when no session was active. Safe to call twice.
    pub fn logout(&mut self) -> bool {
        self.permissions.clear();
        self.auth.logout();

        match self.session.take() {
            Some(session) => {
                info!(
                    user_id = session.user.id,
                    token = %session.token,
                    "Session ended"
                );
                self.log_security_event(Some(session.user.id), "logout", None, "");
                true
            }
            None => false,
        }
    }

    /// Whether the current session exists and has not timed out.
    ///
    /// Expiry is enforced lazily: an expired session is logged out as a
    /// side effect of this check.
    pub fn is_session_valid(&mut self) -> bool {
        let expired = match &self.session {
            None => return false,
            Some(session) => session.is_expired(self.timeout),
        };

        if expired {
            let user_id = self.session.as_ref().map(|s| s.user.id);
            info!(user_id = user_id, "Session expired");
            self.log_security_event(user_id, "session_expired", None, "");
            self.logout();
            return false;
        }

        true
    }

    /// Check a permission against the per-module cache.
    ///
    /// Admin is always allowed. With `module` absent, every cached
    /// module must grant the level.
    pub fn has_permission(&self, level: AccessLevel, module: Option<Module>) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        if session.user.role == Role::Admin {
            return true;
        }

        match module {
            Some(module) => self
                .permissions
                .get(&module)
                .map_or(false, |levels| levels.contains(&level)),
            None => {
                !self.permissions.is_empty()
                    && self.permissions.values().all(|levels| levels.contains(&level))
            }
        }
    }

    /// The modules the current user may see.
    ///
    /// With no session, or an unrecognized role, this is the minimal
    /// default list. Never empty, never an error.
    pub fn get_user_modules(&self) -> Vec<Module> {
        let role = self
            .session
            .as_ref()
            .map(|s| s.user.role)
            .unwrap_or_default();
        modules_for_role(role).to_vec()
    }

    /// Record a security event.
    ///
    /// Best effort: a failure is logged and swallowed so it can never
    /// affect the operation being recorded.
    pub fn log_security_event(
        &self,
        user_id: Option<i64>,
        action: &str,
        module: Option<Module>,
        detail: &str,
    ) {
        let audit = AuditLog::new(self.auth.db());
        if let Err(e) = audit.record(user_id, action, module.map(|m| m.as_str()), detail) {
            warn!(error = %e, action = action, "Failed to record security event");
        }
    }

    /// Clear all session state, for test isolation.
    pub fn reset(&mut self) {
        self.session = None;
        self.permissions.clear();
        self.limiter = LoginLimiter::new(self.limiter.max_attempts, self.limiter.lockout);
        self.auth.logout();
    }
}

impl std::fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityManager")
            .field("session", &self.session.is_some())
            .finish()
    }
}

/// Build the per-module permission cache for a role.
fn derive_permissions(role: Role) -> HashMap<Module, &'static [AccessLevel]> {
    modules_for_role(role)
        .iter()
        .map(|module| (*module, levels_for_role(role)))
        .collect()
}
