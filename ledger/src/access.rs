//! # Permission Gate
//!
//! A flat two-role capability model. The **administrator** role governs
//! role assignment itself; the **operator** role governs the asset
//! registry and the two limits. There is no hierarchy: holding the
//! administrator role does not implicitly grant operator, so a deployment
//! that wants one principal to do both must grant both explicitly (the
//! founding principal receives both at construction).
//!
//! No other component consults the administrator role -- it exists purely
//! to bootstrap and maintain the role sets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during permission checks.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The acting principal does not hold the required role.
    #[error("unauthorized: {principal} does not hold the {role} role")]
    Unauthorized {
        /// The principal that attempted the operation.
        principal: String,
        /// The role that was required.
        role: Role,
    },
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The two capability roles recognized by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Grants and revokes roles. Consulted by nothing else.
    Administrator,

    /// Mutates the asset registry and the capacity/withdraw limits.
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

// ---------------------------------------------------------------------------
// AccessControl
// ---------------------------------------------------------------------------

/// The set of principals holding each role.
///
/// Principals are opaque address strings (e.g. `custodia:<hex-pubkey>`);
/// the gate never interprets them. Both sets start containing only the
/// founding principal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessControl {
    administrators: HashSet<String>,
    operators: HashSet<String>,
}

impl AccessControl {
    /// Creates a gate with the founding principal holding both roles.
    ///
    /// Both grants are explicit: the founder appears in each set rather
    /// than being special-cased anywhere.
    pub fn new(founder: &str) -> Self {
        let mut administrators = HashSet::new();
        administrators.insert(founder.to_string());
        let mut operators = HashSet::new();
        operators.insert(founder.to_string());
        Self {
            administrators,
            operators,
        }
    }

    /// Returns `true` if `principal` holds `role`.
    pub fn has_role(&self, principal: &str, role: Role) -> bool {
        self.set(role).contains(principal)
    }

    /// Fails with [`AccessError::Unauthorized`] unless `principal` holds
    /// `role`.
    pub fn require(&self, principal: &str, role: Role) -> Result<(), AccessError> {
        if self.has_role(principal, role) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized {
                principal: principal.to_string(),
                role,
            })
        }
    }

    /// Grants `role` to `principal`. The caller must be an administrator.
    ///
    /// Granting a role a principal already holds is a no-op.
    pub fn grant(&mut self, caller: &str, principal: &str, role: Role) -> Result<(), AccessError> {
        self.require(caller, Role::Administrator)?;
        self.set_mut(role).insert(principal.to_string());
        Ok(())
    }

    /// Revokes `role` from `principal`. The caller must be an administrator.
    ///
    /// There is no self-revocation guard beyond the role check itself: an
    /// administrator can revoke their own administrator role and lock the
    /// gate. That matches the modeled permission semantics.
    pub fn revoke(&mut self, caller: &str, principal: &str, role: Role) -> Result<(), AccessError> {
        self.require(caller, Role::Administrator)?;
        self.set_mut(role).remove(principal);
        Ok(())
    }

    fn set(&self, role: Role) -> &HashSet<String> {
        match role {
            Role::Administrator => &self.administrators,
            Role::Operator => &self.operators,
        }
    }

    fn set_mut(&mut self, role: Role) -> &mut HashSet<String> {
        match role {
            Role::Administrator => &mut self.administrators,
            Role::Operator => &mut self.operators,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FOUNDER: &str = "custodia:founder";
    const ALICE: &str = "custodia:alice";
    const BOB: &str = "custodia:bob";

    #[test]
    fn founder_holds_both_roles() {
        let gate = AccessControl::new(FOUNDER);
        assert!(gate.has_role(FOUNDER, Role::Administrator));
        assert!(gate.has_role(FOUNDER, Role::Operator));
    }

    #[test]
    fn unknown_principal_holds_nothing() {
        let gate = AccessControl::new(FOUNDER);
        assert!(!gate.has_role(ALICE, Role::Administrator));
        assert!(!gate.has_role(ALICE, Role::Operator));
        assert!(matches!(
            gate.require(ALICE, Role::Operator),
            Err(AccessError::Unauthorized { .. })
        ));
    }

    #[test]
    fn administrator_can_grant_operator() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.grant(FOUNDER, ALICE, Role::Operator).unwrap();
        assert!(gate.has_role(ALICE, Role::Operator));
        // Operator does not imply administrator.
        assert!(!gate.has_role(ALICE, Role::Administrator));
    }

    #[test]
    fn non_administrator_cannot_grant() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.grant(FOUNDER, ALICE, Role::Operator).unwrap();

        // Alice is an operator but not an administrator.
        let result = gate.grant(ALICE, BOB, Role::Operator);
        assert!(matches!(result, Err(AccessError::Unauthorized { .. })));
        assert!(!gate.has_role(BOB, Role::Operator));
    }

    #[test]
    fn administrator_can_revoke() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.grant(FOUNDER, ALICE, Role::Operator).unwrap();
        gate.revoke(FOUNDER, ALICE, Role::Operator).unwrap();
        assert!(!gate.has_role(ALICE, Role::Operator));
    }

    #[test]
    fn revoking_an_unheld_role_is_a_noop() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.revoke(FOUNDER, ALICE, Role::Operator).unwrap();
        assert!(!gate.has_role(ALICE, Role::Operator));
    }

    #[test]
    fn administrator_can_revoke_themselves() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.revoke(FOUNDER, FOUNDER, Role::Administrator).unwrap();
        // The gate is now locked for role changes.
        assert!(matches!(
            gate.grant(FOUNDER, ALICE, Role::Operator),
            Err(AccessError::Unauthorized { .. })
        ));
        // But the founder's operator role survives.
        assert!(gate.has_role(FOUNDER, Role::Operator));
    }

    #[test]
    fn access_control_serialization_roundtrip() {
        let mut gate = AccessControl::new(FOUNDER);
        gate.grant(FOUNDER, ALICE, Role::Operator).unwrap();

        let json = serde_json::to_string(&gate).expect("serialize");
        let recovered: AccessControl = serde_json::from_str(&json).expect("deserialize");

        assert!(recovered.has_role(FOUNDER, Role::Administrator));
        assert!(recovered.has_role(ALICE, Role::Operator));
    }
}
