use serde::{Deserialize, Serialize};

/// Identity of the already-authenticated caller, used for audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    /// Caller for startup tasks such as seeding.
    pub fn system() -> Self {
        Self::new("system", vec!["ADMIN".to_string()])
    }

    /// Caller used when a request carries no identity headers.
    pub fn anonymous() -> Self {
        Self::new("anonymous", Vec::new())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
