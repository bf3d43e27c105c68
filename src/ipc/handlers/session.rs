use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::Role;
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let role_str = match req.params.get("role").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing params.role", None),
    };
    let Some(role) = Role::parse(role_str) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown role: {}", role_str),
            None,
        );
    };

    // Credentials are accepted but never verified; only the claimed role and
    // the submitted identifier shape the identity. A login while already
    // logged in replaces the previous identity.
    let claimed = req.params.get("credentials").and_then(|c| match role {
        Role::Student => c.get("studentId"),
        Role::Admin => c.get("email"),
    });
    let claimed = claimed.and_then(|v| v.as_str());

    match session.login(role, claimed) {
        Ok(identity) => {
            tracing::info!(role = role.as_str(), "login");
            match serde_json::to_value(&identity) {
                Ok(v) => ok(&req.id, json!({ "identity": v })),
                Err(e) => err(&req.id, "internal", e.to_string(), None),
            }
        }
        Err(e) => err(&req.id, "session_save_failed", e.to_string(), None),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match session.logout() {
        Ok(()) => {
            tracing::info!("logout");
            ok(&req.id, json!({ "loggedOut": true }))
        }
        Err(e) => err(&req.id, "session_clear_failed", e.to_string(), None),
    }
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let identity = match session.identity() {
        Some(i) => match serde_json::to_value(i) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "internal", e.to_string(), None),
        },
        None => serde_json::Value::Null,
    };
    ok(
        &req.id,
        json!({
            "authenticated": session.identity().is_some(),
            "identity": identity
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
