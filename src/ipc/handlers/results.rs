use crate::db;
use crate::grade;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const COLUMNS: &str = "id, student_no, course_code, course_name, semester, marks, grade";

fn row_json(row: &rusqlite::Row) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let student_no: Option<String> = row.get(1)?;
    let course_code: String = row.get(2)?;
    let course_name: String = row.get(3)?;
    let semester: String = row.get(4)?;
    let marks: i64 = row.get(5)?;
    let grade: String = row.get(6)?;
    Ok(json!({
        "id": id,
        "studentId": student_no,
        "courseCode": course_code,
        "courseName": course_name,
        "semester": semester,
        "marks": marks,
        "grade": grade
    }))
}

fn fetch_one(conn: &Connection, id: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    conn.query_row(
        &format!("SELECT {} FROM results WHERE id = ?", COLUMNS),
        [id],
        row_json,
    )
    .optional()
}

fn list_filtered(
    conn: &Connection,
    semester: Option<&str>,
) -> rusqlite::Result<Vec<serde_json::Value>> {
    match semester {
        Some(sem) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM results WHERE semester = ? ORDER BY semester, course_code",
                COLUMNS
            ))?;
            let rows = stmt.query_map([sem], row_json)?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM results ORDER BY semester, course_code",
                COLUMNS
            ))?;
            let rows = stmt.query_map([], row_json)?;
            rows.collect()
        }
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let semester = req.params.get("semester").and_then(|v| v.as_str());
    match list_filtered(conn, semester) {
        Ok(results) => ok(&req.id, json!({ "results": results })),
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
        Ok(Some(result)) => ok(&req.id, json!({ "result": result })),
        Ok(None) => err(&req.id, "not_found", "result not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let p = &req.params;
    let get = |k: &str| p.get(k).and_then(|v| v.as_str()).map(str::trim);
    let (Some(course_code), Some(semester)) = (get("courseCode"), get("semester")) else {
        return err(&req.id, "bad_params", "missing courseCode or semester", None);
    };
    if course_code.is_empty() || semester.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "courseCode and semester must not be empty",
            None,
        );
    }
    let Some(marks) = p.get("marks").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing or non-numeric marks", None);
    };
    if !(0..=100).contains(&marks) {
        return err(&req.id, "bad_params", "marks must be within 0..=100", None);
    }
    let student_no = get("studentId");

    // Course name falls back to the course catalog, then to the bare code.
    let course_name = match get("courseName") {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            let looked_up: Option<String> = match conn
                .query_row(
                    "SELECT name FROM courses WHERE code = ?",
                    [course_code],
                    |r| r.get(0),
                )
                .optional()
            {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            };
            looked_up.unwrap_or_else(|| course_code.to_string())
        }
    };

    // The grade column is derived from marks unless the caller pins one.
    let grade = match get("grade") {
        Some(g) if !g.is_empty() => g.to_string(),
        _ => grade::grade_for_marks(marks).to_string(),
    };

    let id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO results(id, student_no, course_code, course_name, semester, marks, grade, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            student_no,
            course_code,
            &course_name,
            semester,
            marks,
            &grade,
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "results" })),
        );
    }

    match fetch_one(conn, &id) {
        Ok(Some(result)) => ok(&req.id, json!({ "result": result })),
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
        .query_row("SELECT 1 FROM results WHERE id = ?", [&id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "result not found", None);
    }

    // Validate the whole patch before any write; a rejected patch leaves
    // the row untouched.
    if let Some(unknown) = patch.keys().find(|k| {
        !matches!(
            k.as_str(),
            "studentId" | "courseCode" | "courseName" | "semester" | "marks" | "grade"
        )
    }) {
        return err(
            &req.id,
            "bad_params",
            format!("unknown patch field: {}", unknown),
            None,
        );
    }
    let mut text_changes: Vec<(&str, String)> = Vec::new();
    for (key, column) in [
        ("studentId", "student_no"),
        ("courseCode", "course_code"),
        ("courseName", "course_name"),
        ("semester", "semester"),
        ("grade", "grade"),
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
        text_changes.push((column, value.to_string()));
    }
    let marks = match patch.get("marks") {
        Some(value) => {
            let Some(marks) = value.as_i64() else {
                return err(&req.id, "bad_params", "patch.marks must be a number", None);
            };
            if !(0..=100).contains(&marks) {
                return err(&req.id, "bad_params", "marks must be within 0..=100", None);
            }
            Some(marks)
        }
        None => None,
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    for (column, value) in &text_changes {
        if let Err(e) = tx.execute(
            &format!("UPDATE results SET {} = ?, updated_at = ? WHERE id = ?", column),
            (value, db::now_rfc3339(), &id),
        ) {
            let _ = tx.rollback();
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    if let Some(marks) = marks {
        if let Err(e) = tx.execute(
            "UPDATE results SET marks = ?, updated_at = ? WHERE id = ?",
            (marks, db::now_rfc3339(), &id),
        ) {
            let _ = tx.rollback();
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        // New marks re-derive the grade unless this patch also pinned one.
        if !patch.contains_key("grade") {
            if let Err(e) = tx.execute(
                "UPDATE results SET grade = ? WHERE id = ?",
                (grade::grade_for_marks(marks), &id),
            ) {
                let _ = tx.rollback();
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    match fetch_one(conn, &id) {
        Ok(Some(result)) => ok(&req.id, json!({ "result": result })),
        Ok(None) => err(&req.id, "not_found", "result not found", None),
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
    match conn.execute("DELETE FROM results WHERE id = ?", [id]) {
        Ok(0) => err(&req.id, "not_found", "result not found", None),
        Ok(_) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

/// Student-facing read, optionally narrowed by semester. Mirrors the demo
/// app: every result row belongs to the one demo student.
fn handle_student_results(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let semester = req.params.get("semester").and_then(|v| v.as_str());
    match list_filtered(conn, semester) {
        Ok(results) => ok(&req.id, json!({ "results": results })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.list" => Some(handle_list(state, req)),
        "results.get" => Some(handle_get(state, req)),
        "results.create" => Some(handle_create(state, req)),
        "results.update" => Some(handle_update(state, req)),
        "results.delete" => Some(handle_delete(state, req)),
        "student.results" => Some(handle_student_results(state, req)),
        _ => None,
    }
}
