/// What a route demands of a request beyond a valid session token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Role names allowed through the role gate. `None` skips the gate.
    pub roles: Option<Vec<String>>,
    /// Permission checked against the caller's role. `None` skips the gate.
    pub permission: Option<String>,
}

impl AccessPolicy {
    /// Any holder of a valid token.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Role gate on `admin` followed by a permission gate.
    pub fn admin(permission: &str) -> Self {
        Self::authenticated()
            .with_roles(["admin"])
            .with_permission(permission)
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_has_no_gates() {
        let policy = AccessPolicy::authenticated();
        assert!(policy.roles.is_none());
        assert!(policy.permission.is_none());
    }

    #[test]
    fn admin_policy_gates_role_and_permission() {
        let policy = AccessPolicy::admin("role:read");
        assert_eq!(policy.roles, Some(vec!["admin".to_string()]));
        assert_eq!(policy.permission.as_deref(), Some("role:read"));
    }
}
