use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const COLUMNS: &str = "id, student_no, name, email, semester, department";

fn row_json(row: &rusqlite::Row) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let student_no: String = row.get(1)?;
    let name: String = row.get(2)?;
    let email: String = row.get(3)?;
    let semester: String = row.get(4)?;
    let department: String = row.get(5)?;
    Ok(json!({
        "id": id,
        "studentId": student_no,
        "name": name,
        "email": email,
        "semester": semester,
        "department": department
    }))
}

fn fetch_one(conn: &Connection, id: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    conn.query_row(
        &format!("SELECT {} FROM students WHERE id = ?", COLUMNS),
        [id],
        row_json,
    )
    .optional()
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let mut stmt = match conn.prepare(&format!(
        "SELECT {} FROM students ORDER BY student_no",
        COLUMNS
    )) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(students) => ok(&req.id, json!({ "students": students })),
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
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let p = &req.params;
    let get = |k: &str| p.get(k).and_then(|v| v.as_str()).map(str::trim);
    let (Some(student_no), Some(name)) = (get("studentId"), get("name")) else {
        return err(&req.id, "bad_params", "missing studentId or name", None);
    };
    if student_no.is_empty() || name.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "studentId and name must not be empty",
            None,
        );
    }
    let email = get("email").unwrap_or("");
    let semester = get("semester").unwrap_or("");
    let department = get("department").unwrap_or("");

    let id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(id, student_no, name, email, semester, department, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            student_no,
            name,
            email,
            semester,
            department,
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    match fetch_one(conn, &id) {
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
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
        .query_row("SELECT 1 FROM students WHERE id = ?", [&id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    // Validate the whole patch before touching the row; a rejected patch
    // must leave the record exactly as it was. Unknown keys are rejected so
    // a typoed key fails loudly instead of being dropped.
    if let Some(unknown) = patch.keys().find(|k| {
        !matches!(
            k.as_str(),
            "studentId" | "name" | "email" | "semester" | "department"
        )
    }) {
        return err(
            &req.id,
            "bad_params",
            format!("unknown patch field: {}", unknown),
            None,
        );
    }
    let mut changes: Vec<(&str, String)> = Vec::new();
    for (key, column) in [
        ("studentId", "student_no"),
        ("name", "name"),
        ("email", "email"),
        ("semester", "semester"),
        ("department", "department"),
    ] {
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
        changes.push((column, value.to_string()));
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    for (column, value) in &changes {
        if let Err(e) = tx.execute(
            &format!("UPDATE students SET {} = ?, updated_at = ? WHERE id = ?", column),
            (value, db::now_rfc3339(), &id),
        ) {
            let _ = tx.rollback();
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    match fetch_one(conn, &id) {
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
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
    match conn.execute("DELETE FROM students WHERE id = ?", [id]) {
        Ok(0) => err(&req.id, "not_found", "student not found", None),
        Ok(_) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

/// The student-facing profile read. The demo data has no per-login student
/// mapping, so this mirrors the source app: the first student record is
/// "the" logged-in student.
fn handle_profile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let row = conn
        .query_row(
            &format!("SELECT {} FROM students ORDER BY student_no LIMIT 1", COLUMNS),
            [],
            row_json,
        )
        .optional();
    match row {
        Ok(Some(profile)) => ok(&req.id, json!({ "profile": profile })),
        Ok(None) => err(&req.id, "not_found", "no student records", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "student.profile" => Some(handle_profile(state, req)),
        _ => None,
    }
}
