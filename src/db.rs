use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("records.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            student_no TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            semester TEXT NOT NULL,
            department TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_no ON students(student_no)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            credits INTEGER NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_courses_code ON courses(code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            id TEXT PRIMARY KEY,
            student_no TEXT,
            course_code TEXT NOT NULL,
            course_name TEXT NOT NULL,
            semester TEXT NOT NULL,
            marks INTEGER NOT NULL,
            grade TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_semester ON results(semester)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_student ON results(student_no)",
        [],
    )?;

    seed_demo_rows(&conn)?;

    Ok(conn)
}

/// A fresh workspace starts with the demo records the host UI expects to see.
/// Only ever runs against empty tables, so user edits are never clobbered.
fn seed_demo_rows(conn: &Connection) -> anyhow::Result<()> {
    let student_count: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    if student_count == 0 {
        let rows = [
            ("1", "S001", "John Doe", "john@example.com", "3rd", "CSE"),
            ("2", "S002", "Jane Smith", "jane@example.com", "2nd", "EEE"),
            ("3", "S003", "Bob Johnson", "bob@example.com", "3rd", "CSE"),
        ];
        for (id, no, name, email, semester, department) in rows {
            conn.execute(
                "INSERT INTO students(id, student_no, name, email, semester, department)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (id, no, name, email, semester, department),
            )?;
        }
    }

    let course_count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))?;
    if course_count == 0 {
        let rows = [
            ("1", "CSE101", "Introduction to Programming", 3i64),
            ("2", "CSE102", "Data Structures", 3),
            ("3", "MATH101", "Calculus", 3),
        ];
        for (id, code, name, credits) in rows {
            conn.execute(
                "INSERT INTO courses(id, code, name, credits) VALUES(?, ?, ?, ?)",
                (id, code, name, credits),
            )?;
        }
    }

    let result_count: i64 = conn.query_row("SELECT COUNT(*) FROM results", [], |r| r.get(0))?;
    if result_count == 0 {
        let rows = [
            (
                "1",
                "S001",
                "CSE101",
                "Introduction to Programming",
                "1st",
                85i64,
                "A",
            ),
            ("2", "S001", "MATH101", "Calculus", "1st", 78, "B+"),
            ("3", "S001", "CSE102", "Data Structures", "2nd", 90, "A+"),
        ];
        for (id, student_no, code, name, semester, marks, grade) in rows {
            conn.execute(
                "INSERT INTO results(id, student_no, course_code, course_name, semester, marks, grade)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (id, student_no, code, name, semester, marks, grade),
            )?;
        }
    }

    Ok(())
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
