//! Solera - authentication and access-control core
//!
//! The in-process library behind the Solera business management suite:
//! password hashing with legacy migration, credential verification,
//! session handling, and the role→module permission model the UI uses
//! to decide what to render.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use auth::{
    modules_for_role, role_allows, validate_strength, validate_username, AccessLevel, AuthManager,
    CreateUserError, CreateUserRequest, HashFormat, HashMethod, Module, PasswordChangeError,
    PasswordError, PasswordHasher, SecurityManager, Session, StrengthIssue, StrengthPolicy,
    UserInfo, ValidationError,
};
pub use config::Config;
pub use db::{AuditLog, Database, NewUser, Role, SecurityEvent, User, UserRepository, UserUpdate};
pub use error::{Result, SoleraError};
