use crate::session::{Identity, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
}

/// Pure decision over (current identity, required role). First match wins:
/// no identity sends the caller to login, a route without a role requirement
/// always renders, and a role mismatch is a deny, never an error.
pub fn authorize(identity: Option<&Identity>, required: Option<Role>) -> Decision {
    let Some(identity) = identity else {
        return Decision::RedirectToLogin;
    };
    match required {
        None => Decision::Allow,
        Some(role) if identity.role == role => Decision::Allow,
        Some(_) => Decision::RedirectToUnauthorized,
    }
}
