use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "school.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'admin',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            sections TEXT NOT NULL DEFAULT '[]',
            subjects TEXT NOT NULL DEFAULT '[]',
            schedule TEXT,
            section_capacity INTEGER
        )",
        [],
    )?;

    // Students reference classes by name, not by id. The admission form writes
    // whatever class name it was given; dangling names are tolerated.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            admission_no TEXT NOT NULL UNIQUE,
            temp_roll_no TEXT,
            perm_roll_no TEXT,
            dob TEXT,
            gender TEXT,
            religion TEXT,
            category TEXT,
            blood_group TEXT,
            father_name TEXT,
            mother_name TEXT,
            guardian_phone TEXT,
            guardian_email TEXT,
            address TEXT,
            class_name TEXT NOT NULL,
            section TEXT,
            facility_type TEXT,
            previous_school TEXT,
            previous_marks TEXT NOT NULL DEFAULT '[]',
            photo_path TEXT,
            photo_url TEXT,
            fee_start_date TEXT,
            fee_due_day INTEGER,
            custom_fee_structure INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            admitted_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_admission ON students(admission_no)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fee_structure(
            class_name TEXT PRIMARY KEY,
            tuition_fee REAL NOT NULL,
            exam_fee REAL NOT NULL,
            sports_fee REAL NOT NULL
        )",
        [],
    )?;

    // UNIQUE(student_id, month, year) closes the duplicate-generation race at
    // the storage layer; the handler still checks first for a friendly error.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fees(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            amount REAL NOT NULL,
            discount_type TEXT,
            discount_percent REAL,
            discount_amount REAL NOT NULL DEFAULT 0,
            final_amount REAL NOT NULL,
            additional_fees TEXT NOT NULL DEFAULT '[]',
            total_amount REAL NOT NULL,
            due_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            UNIQUE(student_id, month, year)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_student ON fees(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_month_year ON fees(year, month)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fee_payments(
            id TEXT PRIMARY KEY,
            fee_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            amount REAL NOT NULL,
            method TEXT NOT NULL,
            cheque_no TEXT,
            receipt_no TEXT NOT NULL,
            discount_amount REAL NOT NULL DEFAULT 0,
            additional_total REAL NOT NULL DEFAULT 0,
            paid_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fee_payments_fee ON fee_payments(fee_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fee_payments_student ON fee_payments(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notices(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            attachment_path TEXT,
            attachment_url TEXT,
            published_on TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            event_date TEXT,
            image_path TEXT,
            image_url TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS banners(
            id TEXT PRIMARY KEY,
            title TEXT,
            image_path TEXT NOT NULL,
            image_url TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS alumni(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            batch_year INTEGER,
            occupation TEXT,
            message TEXT,
            photo_path TEXT,
            photo_url TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            designation TEXT,
            qualification TEXT,
            subject TEXT,
            phone TEXT,
            email TEXT,
            photo_path TEXT,
            photo_url TEXT,
            joined_on TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS gallery_photos(
            id TEXT PRIMARY KEY,
            caption TEXT,
            album TEXT,
            image_path TEXT NOT NULL,
            image_url TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Certificates keep a denormalized snapshot of the student at issue time;
    // later edits or deletion of the student row must not change a TC.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS certificates(
            id TEXT PRIMARY KEY,
            serial_no TEXT NOT NULL UNIQUE,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            admission_no TEXT NOT NULL,
            class_name TEXT NOT NULL,
            section TEXT,
            dob TEXT,
            gender TEXT,
            father_name TEXT,
            mother_name TEXT,
            category TEXT,
            religion TEXT,
            admitted_at TEXT,
            leaving_reason TEXT,
            conduct TEXT,
            remarks TEXT,
            issued_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_certificates_student ON certificates(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS orders(
            id TEXT PRIMARY KEY,
            student_name TEXT NOT NULL,
            purpose TEXT,
            amount REAL NOT NULL,
            gateway_payment_id TEXT,
            status TEXT NOT NULL DEFAULT 'recorded',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // Early workspaces predate the album column on gallery photos.
    ensure_gallery_album(&conn)?;
    ensure_students_updated_at(&conn)?;

    Ok(conn)
}

fn ensure_gallery_album(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "gallery_photos", "album")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE gallery_photos ADD COLUMN album TEXT", [])?;
    Ok(())
}

fn ensure_students_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}
