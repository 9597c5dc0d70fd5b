use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::types::{CustomerRecord, StaffRecord, StaffRole};

/// Backend-issued identity: the auth service's user id plus the verified
/// email. Ephemeral; produced per access token by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Application roles. The first three are staff roles mirrored from the
/// `users` collection; `Customer` is assigned when the email resolves to a
/// customer record instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Technician,
    Customer,
}

impl Role {
    /// Staff roles that may enter the admin area.
    pub fn is_elevated_staff(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::Technician)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Customer => "customer",
        }
    }
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::SuperAdmin => Role::SuperAdmin,
            StaffRole::Admin => Role::Admin,
            StaffRole::Technician => Role::Technician,
        }
    }
}

/// Resolved application session. Backed by exactly one staff record or one
/// customer record; the role is never taken from client-supplied data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// Present only for customer sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

impl Session {
    pub fn from_staff(rec: &StaffRecord) -> Self {
        Self {
            id: rec.id,
            email: rec.email.clone(),
            full_name: rec.full_name.clone(),
            role: rec.role.into(),
            invoice_number: None,
        }
    }

    pub fn from_customer(rec: &CustomerRecord) -> Self {
        Self {
            id: rec.id,
            email: rec.email.clone().unwrap_or_default(),
            full_name: rec.name.clone(),
            role: Role::Customer,
            invoice_number: Some(rec.invoice_number.clone()),
        }
    }
}
