//! User model for Solera.
//!
//! This module defines the User struct and the Role enum used across the
//! auth layer.

use std::fmt;
use std::str::FromStr;

/// User role for permission management.
///
/// Roles are tags, not a strict hierarchy: apart from Admin, the
/// department roles are lateral. The role decides which application
/// modules a user may see (see `auth::permission`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Full administrator.
    Admin,
    /// Supervisor with read/write access across departments.
    Supervisor,
    /// Accounting department.
    Contabilidad,
    /// Inventory department.
    Inventario,
    /// Works/projects department.
    Obras,
    /// Basic user with minimal access.
    #[default]
    Basico,
}

impl Role {
    /// Convert role to its database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Contabilidad => "contabilidad",
            Role::Inventario => "inventario",
            Role::Obras => "obras",
            Role::Basico => "basico",
        }
    }

    /// Get display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Supervisor => "Supervisor",
            Role::Contabilidad => "Contabilidad",
            Role::Inventario => "Inventario",
            Role::Obras => "Obras",
            Role::Basico => "Básico",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "contabilidad" => Ok(Role::Contabilidad),
            "inventario" => Ok(Role::Inventario),
            "obras" => Ok(Role::Obras),
            "basico" | "usuario" => Ok(Role::Basico),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User entity representing a stored account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique).
    pub username: String,
    /// Self-describing password hash string. Never logged or displayed.
    pub password_hash: String,
    /// Display name.
    pub display_name: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// User role for permissions.
    pub role: Role,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last login timestamp (optional).
    pub last_login: Option<String>,
    /// Whether the account is active.
    pub is_active: bool,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Password hash (must be pre-hashed, never plaintext).
    pub password_hash: String,
    /// Display name.
    pub display_name: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// User role (defaults to Basico).
    pub role: Role,
}

impl NewUser {
    /// Create a new user with the minimal required fields.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
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

/// Data for updating an existing user.
///
/// The fields of this struct are the complete allow-list of updatable
/// columns; password changes go through a dedicated operation instead.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New display name.
    pub display_name: Option<String>,
    /// New email address (Some(None) clears it).
    pub email: Option<Option<String>>,
    /// New role.
    pub role: Option<Role>,
    /// New active status.
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new display name.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set new email (Some to update, None to clear).
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    /// Set new role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set active status.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("supervisor").unwrap(), Role::Supervisor);
        assert_eq!(Role::from_str("contabilidad").unwrap(), Role::Contabilidad);
        assert_eq!(Role::from_str("inventario").unwrap(), Role::Inventario);
        assert_eq!(Role::from_str("obras").unwrap(), Role::Obras);
        assert_eq!(Role::from_str("basico").unwrap(), Role::Basico);
        assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
        assert!(Role::from_str("invalid").is_err());
    }

    #[test]
    fn test_role_legacy_tag() {
        // Old records used 'usuario' for the basic role
        assert_eq!(Role::from_str("usuario").unwrap(), Role::Basico);
    }

    #[test]
    fn test_role_as_str_round_trip() {
        for role in [
            Role::Admin,
            Role::Supervisor,
            Role::Contabilidad,
            Role::Inventario,
            Role::Obras,
            Role::Basico,
        ] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn test_role_display() {
        assert_eq!(format!("{}", Role::Admin), "admin");
        assert_eq!(Role::Basico.display_name(), "Básico");
    }

    #[test]
    fn test_role_default() {
        assert_eq!(Role::default(), Role::Basico);
    }

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("mgarcia", "hash", "María García")
            .with_email("mgarcia@example.com")
            .with_role(Role::Supervisor);

        assert_eq!(user.username, "mgarcia");
        assert_eq!(user.password_hash, "hash");
        assert_eq!(user.display_name, "María García");
        assert_eq!(user.email, Some("mgarcia@example.com".to_string()));
        assert_eq!(user.role, Role::Supervisor);
    }

    #[test]
    fn test_user_update_builder() {
        let update = UserUpdate::new()
            .display_name("New Name")
            .role(Role::Obras)
            .is_active(false);

        assert!(update.display_name.is_some());
        assert!(update.role.is_some());
        assert!(update.is_active.is_some());
        assert!(update.email.is_none());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_user_update_empty() {
        assert!(UserUpdate::new().is_empty());
    }

    #[test]
    fn test_user_update_clear_email() {
        let update = UserUpdate::new().email(None);
        assert_eq!(update.email, Some(None));
        assert!(!update.is_empty());
    }
}
