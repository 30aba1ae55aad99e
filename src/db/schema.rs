/// Schema for the offline check-in queue.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    class_id INTEGER NOT NULL,
    notes TEXT,
    captured_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
