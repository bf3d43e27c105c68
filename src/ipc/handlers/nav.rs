use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::routes::{self, Outcome};
use serde_json::json;

fn handle_guard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let path = match req.params.get("path").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing params.path", None),
    };

    match routes::guard(session.identity(), path) {
        Outcome::Render(p) => ok(&req.id, json!({ "outcome": "render", "path": p })),
        Outcome::Redirect(to) => ok(&req.id, json!({ "outcome": "redirect", "to": to })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "nav.guard" => Some(handle_guard(state, req)),
        _ => None,
    }
}
