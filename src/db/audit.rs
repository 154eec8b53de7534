//! Security-event log for Solera.
//!
//! Recording is best effort: the auth layer logs and swallows failures
//! so auditing can never break the operation being audited.

use rusqlite::params;

use super::Database;
use crate::Result;

/// A recorded security event.
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    /// Event ID.
    pub id: i64,
    /// User the event concerns, when known.
    pub user_id: Option<i64>,
    /// Action tag, e.g. "login_success", "logout".
    pub action: String,
    /// Module tag, when the event concerns one.
    pub module: Option<String>,
    /// Free-text detail.
    pub detail: Option<String>,
    /// When the event was recorded.
    pub created_at: String,
}

/// Repository for the security-event log.
pub struct AuditLog<'a> {
    db: &'a Database,
}

impl<'a> AuditLog<'a> {
    /// Create a new AuditLog with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a security event.
    pub fn record(
        &self,
        user_id: Option<i64>,
        action: &str,
        module: Option<&str>,
        detail: &str,
    ) -> Result<()> {
        self.db.conn().execute(
            "INSERT INTO security_events (user_id, action, module, detail)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, action, module, detail],
        )?;
        Ok(())
    }

    /// List the most recent events, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<SecurityEvent>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, user_id, action, module, detail, created_at
             FROM security_events ORDER BY id DESC LIMIT ?1",
        )?;
        let events = stmt
            .query_map(params![limit], |row| {
                Ok(SecurityEvent {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: row.get(2)?,
                    module: row.get(3)?,
                    detail: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// List the most recent events for a user, newest first.
    pub fn for_user(&self, user_id: i64, limit: u32) -> Result<Vec<SecurityEvent>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, user_id, action, module, detail, created_at
             FROM security_events WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let events = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(SecurityEvent {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: row.get(2)?,
                    module: row.get(3)?,
                    detail: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}
