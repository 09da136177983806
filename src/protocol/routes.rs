use std::collections::HashMap;

use crate::protocol::types::Method;

/// Identifier of one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    // User manager operations
    UserAction,
    UserCreate,
    UserResendEmail,
    UserLogin,
    UserLogout,
    UserChangeEmail,
    UserChangePassword,
    UserChangePasswordInitiate,
    UserRecoveryPassword,
    UserGetCredentials,
    UserGetSettings,
    UserUpdateCredentials,
    UserUpdateSettings,
    UserEnumerateAll,
    UserActivate2faInitiate,
    UserDeactivate2faInitiate,
    // Backend operations
    BackendManualPayout,
    BackendQueryUserBalance,
    BackendQueryUserStats,
    BackendQueryPoolStats,
    BackendQueryFoundBlocks,
    BackendQueryPayouts,
    // Instance operations
    InstanceEnumerateAll,
}

/// The complete route surface. `instanceEnumerateAll` is the one read-only
/// legacy GET route; everything else is POST.
const ROUTES: &[(&str, Method, RouteId)] = &[
    ("userAction", Method::Post, RouteId::UserAction),
    ("userCreate", Method::Post, RouteId::UserCreate),
    ("userResendEmail", Method::Post, RouteId::UserResendEmail),
    ("userLogin", Method::Post, RouteId::UserLogin),
    ("userLogout", Method::Post, RouteId::UserLogout),
    ("userChangeEmail", Method::Post, RouteId::UserChangeEmail),
    ("userChangePassword", Method::Post, RouteId::UserChangePassword),
    ("userChangePasswordInitiate", Method::Post, RouteId::UserChangePasswordInitiate),
    ("userRecoveryPassword", Method::Post, RouteId::UserRecoveryPassword),
    ("userGetCredentials", Method::Post, RouteId::UserGetCredentials),
    ("userGetSettings", Method::Post, RouteId::UserGetSettings),
    ("userUpdateCredentials", Method::Post, RouteId::UserUpdateCredentials),
    ("userUpdateSettings", Method::Post, RouteId::UserUpdateSettings),
    ("userEnumerateAll", Method::Post, RouteId::UserEnumerateAll),
    ("userActivate2faInitiate", Method::Post, RouteId::UserActivate2faInitiate),
    ("userDeactivate2faInitiate", Method::Post, RouteId::UserDeactivate2faInitiate),
    ("backendManualPayout", Method::Post, RouteId::BackendManualPayout),
    ("backendQueryUserBalance", Method::Post, RouteId::BackendQueryUserBalance),
    ("backendQueryUserStats", Method::Post, RouteId::BackendQueryUserStats),
    ("backendQueryPoolStats", Method::Post, RouteId::BackendQueryPoolStats),
    ("backendQueryFoundBlocks", Method::Post, RouteId::BackendQueryFoundBlocks),
    ("backendQueryPayouts", Method::Post, RouteId::BackendQueryPayouts),
    ("instanceEnumerateAll", Method::Get, RouteId::InstanceEnumerateAll),
];

/// Immutable route table built once at startup; lookups are lock-free.
#[derive(Debug)]
pub struct RouteTable {
    entries: HashMap<&'static str, (Method, RouteId)>,
}

impl RouteTable {
    pub fn new() -> Self {
        let entries = ROUTES
            .iter()
            .map(|(name, method, id)| (*name, (*method, *id)))
            .collect();
        Self { entries }
    }

    /// Resolve a route name and method to a handler id.
    ///
    /// An unknown name and a method mismatch are the same outward condition:
    /// the caller answers HTTP 404.
    pub fn lookup(&self, name: &str, method: Method) -> Option<RouteId> {
        match self.entries.get(name) {
            Some((required, id)) if *required == method => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_route_with_required_method() {
        let table = RouteTable::new();
        assert_eq!(
            table.lookup("userLogin", Method::Post),
            Some(RouteId::UserLogin)
        );
        assert_eq!(
            table.lookup("instanceEnumerateAll", Method::Get),
            Some(RouteId::InstanceEnumerateAll)
        );
    }

    #[test]
    fn method_mismatch_is_a_miss() {
        let table = RouteTable::new();
        assert_eq!(table.lookup("userLogin", Method::Get), None);
        assert_eq!(table.lookup("instanceEnumerateAll", Method::Post), None);
    }

    #[test]
    fn unknown_route_is_a_miss() {
        let table = RouteTable::new();
        assert_eq!(table.lookup("fooBarBaz", Method::Post), None);
        assert_eq!(table.lookup("userlogin", Method::Post), None);
    }

    #[test]
    fn every_declared_route_is_reachable() {
        let table = RouteTable::new();
        assert_eq!(table.len(), ROUTES.len());
        for (name, method, id) in ROUTES {
            assert_eq!(table.lookup(name, *method), Some(*id));
        }
    }
}
