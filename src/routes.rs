use crate::authz::{self, Decision};
use crate::session::{Identity, Role};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome of guarding one navigation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Render(String),
    Redirect(String),
}

enum Route {
    /// Renders for everyone, session or not.
    Public,
    /// Renders only when the session carries this role.
    Protected(Role),
    /// Unconditional redirect (the root path, and any unknown path).
    RedirectTo(&'static str),
}

fn route_for(path: &str) -> Route {
    match path {
        "/login" | "/login/admin" | "/unauthorized" => Route::Public,
        "/admin/dashboard" | "/admin/students" | "/admin/courses" | "/admin/results" => {
            Route::Protected(Role::Admin)
        }
        "/student/dashboard" => Route::Protected(Role::Student),
        // "/" and the catch-all both land on the login page.
        _ => Route::RedirectTo(LOGIN_PATH),
    }
}

/// Recomputed fresh on every navigation event from the current session; no
/// transition history is kept.
pub fn guard(identity: Option<&Identity>, path: &str) -> Outcome {
    let required = match route_for(path) {
        Route::RedirectTo(to) => return Outcome::Redirect(to.to_string()),
        Route::Public => return Outcome::Render(path.to_string()),
        Route::Protected(role) => Some(role),
    };
    match authz::authorize(identity, required) {
        Decision::Allow => Outcome::Render(path.to_string()),
        Decision::RedirectToLogin => Outcome::Redirect(LOGIN_PATH.to_string()),
        Decision::RedirectToUnauthorized => Outcome::Redirect(UNAUTHORIZED_PATH.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "1".to_string(),
            display_name: "Test".to_string(),
            role,
            credential_token: "demo-token".to_string(),
        }
    }

    #[test]
    fn no_session_on_admin_route_redirects_to_login() {
        assert_eq!(
            guard(None, "/admin/dashboard"),
            Outcome::Redirect("/login".to_string())
        );
    }

    #[test]
    fn student_session_on_admin_route_redirects_to_unauthorized() {
        let student = identity(Role::Student);
        assert_eq!(
            guard(Some(&student), "/admin/students"),
            Outcome::Redirect("/unauthorized".to_string())
        );
    }

    #[test]
    fn admin_session_on_admin_route_renders() {
        let admin = identity(Role::Admin);
        assert_eq!(
            guard(Some(&admin), "/admin/dashboard"),
            Outcome::Render("/admin/dashboard".to_string())
        );
    }

    #[test]
    fn public_routes_render_without_a_session() {
        for path in ["/login", "/login/admin", "/unauthorized"] {
            assert_eq!(guard(None, path), Outcome::Render(path.to_string()));
        }
    }

    #[test]
    fn root_and_unknown_paths_redirect_to_login_even_when_logged_in() {
        let admin = identity(Role::Admin);
        assert_eq!(
            guard(Some(&admin), "/"),
            Outcome::Redirect("/login".to_string())
        );
        assert_eq!(
            guard(Some(&admin), "/no/such/page"),
            Outcome::Redirect("/login".to_string())
        );
    }
}
