use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const COLUMNS: &str = "id, code, name, credits";

fn row_json(row: &rusqlite::Row) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let code: String = row.get(1)?;
    let name: String = row.get(2)?;
    let credits: i64 = row.get(3)?;
    Ok(json!({
        "id": id,
        "code": code,
        "name": name,
        "credits": credits
    }))
}

fn fetch_one(conn: &Connection, id: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    conn.query_row(
        &format!("SELECT {} FROM courses WHERE id = ?", COLUMNS),
        [id],
        row_json,
    )
    .optional()
}

fn list_all(conn: &Connection) -> rusqlite::Result<Vec<serde_json::Value>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM courses ORDER BY code", COLUMNS))?;
    let rows = stmt.query_map([], row_json)?;
    rows.collect()
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match list_all(conn) {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match req.params.get("id").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing params.id", None),
    };
    match fetch_one(conn, id) {
        Ok(Some(course)) => ok(&req.id, json!({ "course": course })),
        Ok(None) => err(&req.id, "not_found", "course not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let code = req
        .params
        .get("code")
        .and_then(|v| v.as_str())
        .map(str::trim);
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::trim);
    let (Some(code), Some(name)) = (code, name) else {
        return err(&req.id, "bad_params", "missing code or name", None);
    };
    if code.is_empty() || name.is_empty() {
        return err(&req.id, "bad_params", "code and name must not be empty", None);
    }
    let credits = req.params.get("credits").and_then(|v| v.as_i64()).unwrap_or(3);

    let id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO courses(id, code, name, credits, updated_at) VALUES(?, ?, ?, ?, ?)",
        (&id, code, name, credits, db::now_rfc3339()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    match fetch_one(conn, &id) {
        Ok(Some(course)) => ok(&req.id, json!({ "course": course })),
        Ok(None) => err(&req.id, "internal", "inserted row missing", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match req.params.get("id").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing params.id", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing params.patch", None);
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [&id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "course not found", None);
    }

    // Validate everything first; a rejected patch must not half-apply.
    if let Some(unknown) = patch
        .keys()
        .find(|k| !matches!(k.as_str(), "code" | "name" | "credits"))
    {
        return err(
            &req.id,
            "bad_params",
            format!("unknown patch field: {}", unknown),
            None,
        );
    }
    let mut text_changes: Vec<(&str, String)> = Vec::new();
    for key in ["code", "name"] {
        let Some(value) = patch.get(key) else {
            continue;
        };
        let Some(value) = value.as_str() else {
            return err(
                &req.id,
                "bad_params",
                format!("patch.{} must be a string", key),
                None,
            );
        };
        text_changes.push((key, value.to_string()));
    }
    let credits = match patch.get("credits") {
        Some(value) => match value.as_i64() {
            Some(c) => Some(c),
            None => {
                return err(&req.id, "bad_params", "patch.credits must be a number", None)
            }
        },
        None => None,
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    for (column, value) in &text_changes {
        if let Err(e) = tx.execute(
            &format!("UPDATE courses SET {} = ?, updated_at = ? WHERE id = ?", column),
            (value, db::now_rfc3339(), &id),
        ) {
            let _ = tx.rollback();
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    if let Some(credits) = credits {
        if let Err(e) = tx.execute(
            "UPDATE courses SET credits = ?, updated_at = ? WHERE id = ?",
            (credits, db::now_rfc3339(), &id),
        ) {
            let _ = tx.rollback();
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    match fetch_one(conn, &id) {
        Ok(Some(course)) => ok(&req.id, json!({ "course": course })),
        Ok(None) => err(&req.id, "not_found", "course not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match req.params.get("id").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing params.id", None),
    };
    match conn.execute("DELETE FROM courses WHERE id = ?", [id]) {
        Ok(0) => err(&req.id, "not_found", "course not found", None),
        Ok(_) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

/// Student-facing read: the demo app enrolls every student in every course.
fn handle_student_courses(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match list_all(conn) {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_list(state, req)),
        "courses.get" => Some(handle_get(state, req)),
        "courses.create" => Some(handle_create(state, req)),
        "courses.update" => Some(handle_update(state, req)),
        "courses.delete" => Some(handle_delete(state, req)),
        "student.courses" => Some(handle_student_courses(state, req)),
        _ => None,
    }
}
