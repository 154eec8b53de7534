//! Role-based access control for Solera.
//!
//! A static table maps each role to the application modules it may see,
//! and a coarse rule maps each role to the access levels it may use.
//! Unknown or absent roles always degrade to the minimal default, never
//! to broader access.

use std::fmt;
use std::str::FromStr;

use crate::db::Role;

/// Access level for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// View data.
    Read,
    /// Create or modify data.
    Write,
    /// Administrative operations.
    Admin,
}

impl AccessLevel {
    /// Convert to its string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Admin => "admin",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An application module a user may be granted access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    /// Inventory management.
    Inventario,
    /// Works/projects.
    Obras,
    /// Purchasing.
    Pedidos,
    /// Accounting.
    Contabilidad,
    /// User management.
    Usuarios,
    /// Audit trail.
    Auditoria,
    /// Application settings.
    Configuracion,
}

/// All application modules.
pub const ALL_MODULES: &[Module] = &[
    Module::Inventario,
    Module::Obras,
    Module::Pedidos,
    Module::Contabilidad,
    Module::Usuarios,
    Module::Auditoria,
    Module::Configuracion,
];

/// The minimal module list for unrecognized or basic roles. Never empty.
pub const DEFAULT_MODULES: &[Module] = &[Module::Inventario];

impl Module {
    /// Convert to its string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Inventario => "inventario",
            Module::Obras => "obras",
            Module::Pedidos => "pedidos",
            Module::Contabilidad => "contabilidad",
            Module::Usuarios => "usuarios",
            Module::Auditoria => "auditoria",
            Module::Configuracion => "configuracion",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inventario" => Ok(Module::Inventario),
            "obras" => Ok(Module::Obras),
            "pedidos" => Ok(Module::Pedidos),
            "contabilidad" => Ok(Module::Contabilidad),
            "usuarios" => Ok(Module::Usuarios),
            "auditoria" => Ok(Module::Auditoria),
            "configuracion" => Ok(Module::Configuracion),
            _ => Err(format!("unknown module: {s}")),
        }
    }
}

/// The modules a role may see.
///
/// Admin sees everything; the department roles see their own module plus
/// the ones they coordinate with.
pub fn modules_for_role(role: Role) -> &'static [Module] {
    match role {
        Role::Admin => ALL_MODULES,
        Role::Supervisor => &[
            Module::Inventario,
            Module::Obras,
            Module::Pedidos,
            Module::Contabilidad,
            Module::Auditoria,
        ],
        Role::Contabilidad => &[Module::Contabilidad, Module::Pedidos, Module::Auditoria],
        Role::Inventario => &[Module::Inventario, Module::Pedidos],
        Role::Obras => &[Module::Obras, Module::Inventario],
        Role::Basico => DEFAULT_MODULES,
    }
}

/// The access levels a role may use, independent of module.
pub fn levels_for_role(role: Role) -> &'static [AccessLevel] {
    match role {
        Role::Admin => &[AccessLevel::Read, AccessLevel::Write, AccessLevel::Admin],
        Role::Supervisor => &[AccessLevel::Read, AccessLevel::Write],
        _ => &[AccessLevel::Read],
    }
}

/// Coarse role-based check: does this role allow the given access level
/// at all?
pub fn role_allows(role: Role, level: AccessLevel) -> bool {
    levels_for_role(role).contains(&level)
}
