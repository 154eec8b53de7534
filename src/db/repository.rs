//! User repository for Solera.
//!
//! All queries are parameterized. Updates run one fixed statement per
//! field from the `UserUpdate` allow-list; a column name is never
//! interpolated into SQL text.

use std::str::FromStr;

use rusqlite::{params, OptionalExtension, Row};

use super::user::{NewUser, Role, User, UserUpdate};
use super::Database;
use crate::{Result, SoleraError};

/// A single allowed field update, paired with its fixed statement.
#[derive(Debug)]
enum FieldUpdate<'a> {
    DisplayName(&'a str),
    Email(Option<&'a str>),
    Role(Role),
    IsActive(bool),
}

impl FieldUpdate<'_> {
    fn sql(&self) -> &'static str {
        match self {
            FieldUpdate::DisplayName(_) => "UPDATE users SET display_name = ?1 WHERE id = ?2",
            FieldUpdate::Email(_) => "UPDATE users SET email = ?1 WHERE id = ?2",
            FieldUpdate::Role(_) => "UPDATE users SET role = ?1 WHERE id = ?2",
            FieldUpdate::IsActive(_) => "UPDATE users SET is_active = ?1 WHERE id = ?2",
        }
    }
}

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID.
    pub fn create(&self, new_user: &NewUser) -> Result<User> {
        self.db.conn().execute(
            "INSERT INTO users (username, password_hash, display_name, email, role)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_user.username,
                new_user.password_hash,
                new_user.display_name,
                new_user.email,
                new_user.role.as_str(),
            ],
        )?;

        let id = self.db.conn().last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| SoleraError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .db
            .conn()
            .query_row(
                "SELECT id, username, password_hash, display_name, email, role,
                        created_at, last_login, is_active
                 FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()?;

        Ok(user)
    }

    /// Get an active user by exact username.
    ///
    /// Inactive accounts are invisible to this lookup, so a disabled
    /// account fails authentication the same way an unknown one does.
    pub fn get_active_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .db
            .conn()
            .query_row(
                "SELECT id, username, password_hash, display_name, email, role,
                        created_at, last_login, is_active
                 FROM users WHERE username = ?1 AND is_active = 1",
                params![username],
                map_user,
            )
            .optional()?;

        Ok(user)
    }

    /// Check whether a username already exists (exact match, any status).
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = self.db.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Update the last login timestamp for a user.
    pub fn update_last_login(&self, id: i64) -> Result<()> {
        self.db.conn().execute(
            "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Overwrite a user's password hash.
    ///
    /// Returns false when the user does not exist.
    pub fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<bool> {
        let affected = self.db.conn().execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;
        Ok(affected > 0)
    }

    /// Apply a field-wise update to a user.
    ///
    /// Each set field executes its own prepared statement. Returns the
    /// updated user, or None if not found.
    pub fn apply_update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id);
        }

        let mut fields = Vec::new();
        if let Some(ref display_name) = update.display_name {
            fields.push(FieldUpdate::DisplayName(display_name));
        }
        if let Some(ref email) = update.email {
            fields.push(FieldUpdate::Email(email.as_deref()));
        }
        if let Some(role) = update.role {
            fields.push(FieldUpdate::Role(role));
        }
        if let Some(is_active) = update.is_active {
            fields.push(FieldUpdate::IsActive(is_active));
        }

        let mut affected = 0;
        for field in &fields {
            affected += self.execute_field(id, field)?;
        }

        if affected == 0 {
            return Ok(None);
        }

        self.get_by_id(id)
    }

    fn execute_field(&self, id: i64, field: &FieldUpdate<'_>) -> Result<usize> {
        let sql = field.sql();
        let affected = match field {
            FieldUpdate::DisplayName(value) => {
                self.db.conn().execute(sql, params![value, id])?
            }
            FieldUpdate::Email(value) => self.db.conn().execute(sql, params![value, id])?,
            FieldUpdate::Role(role) => self.db.conn().execute(sql, params![role.as_str(), id])?,
            FieldUpdate::IsActive(value) => self.db.conn().execute(sql, params![value, id])?,
        };
        Ok(affected)
    }

    /// List all active users.
    pub fn list_active(&self) -> Result<Vec<User>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, username, password_hash, display_name, email, role,
                    created_at, last_login, is_active
             FROM users WHERE is_active = 1 ORDER BY username",
        )?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// List all users (including inactive).
    pub fn list_all(&self) -> Result<Vec<User>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, username, password_hash, display_name, email, role,
                    created_at, last_login, is_active
             FROM users ORDER BY username",
        )?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

/// Map a result row to a User.
///
/// An unrecognized role tag degrades to the minimal-access default
/// rather than failing the whole query.
fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        email: row.get(4)?,
        role: Role::from_str(&role_str).unwrap_or_default(),
        created_at: row.get(6)?,
        last_login: row.get(7)?,
        is_active: row.get(8)?,
    })
}
