use expensegate_core::Username;

/// Verified identity for a request.
///
/// Inserted by the auth middleware once the bearer token has been validated
/// and checked against the revocation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    username: Username,
}

impl IdentityContext {
    pub fn new(username: Username) -> Self {
        Self { username }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }
}
