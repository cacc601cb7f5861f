use crate::docs;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, optional_str, require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{OptionalExtension, Row};
use serde_json::json;
use uuid::Uuid;

const CERT_COLUMNS: &str = "id, serial_no, student_id, student_name, admission_no, class_name,
    section, dob, gender, father_name, mother_name, category, religion, admitted_at,
    leaving_reason, conduct, remarks, issued_at";

pub fn certificate_json(row: &Row<'_>) -> rusqlite::Result<serde_json::Value> {
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "serialNo": row.get::<_, String>(1)?,
        "studentId": row.get::<_, String>(2)?,
        "studentName": row.get::<_, String>(3)?,
        "admissionNo": row.get::<_, String>(4)?,
        "className": row.get::<_, String>(5)?,
        "section": row.get::<_, Option<String>>(6)?,
        "dob": row.get::<_, Option<String>>(7)?,
        "gender": row.get::<_, Option<String>>(8)?,
        "fatherName": row.get::<_, Option<String>>(9)?,
        "motherName": row.get::<_, Option<String>>(10)?,
        "category": row.get::<_, Option<String>>(11)?,
        "religion": row.get::<_, Option<String>>(12)?,
        "admittedAt": row.get::<_, Option<String>>(13)?,
        "leavingReason": row.get::<_, Option<String>>(14)?,
        "conduct": row.get::<_, Option<String>>(15)?,
        "remarks": row.get::<_, Option<String>>(16)?,
        "issuedAt": row.get::<_, String>(17)?,
    }))
}

pub fn load_certificate(
    conn: &rusqlite::Connection,
    req: &Request,
    certificate_id: &str,
) -> Result<serde_json::Value, serde_json::Value> {
    let sql = format!("SELECT {} FROM certificates WHERE id = ?", CERT_COLUMNS);
    conn.query_row(&sql, [certificate_id], certificate_json)
        .optional()
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?
        .ok_or_else(|| err(&req.id, "not_found", "certificate not found", None))
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    type StudentSnapshot = (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
    );
    let student: Option<StudentSnapshot> = match conn
        .query_row(
            "SELECT name, admission_no, class_name, section, dob, gender, father_name,
                    mother_name, category, religion, admitted_at
             FROM students WHERE id = ?",
            [&student_id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                    r.get(8)?,
                    r.get(9)?,
                    r.get(10)?,
                ))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((
        name,
        admission_no,
        class_name,
        section,
        dob,
        gender,
        father_name,
        mother_name,
        category,
        religion,
        admitted_at,
    )) = student
    else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let certificate_id = Uuid::new_v4().to_string();
    let serial_no = docs::tc_serial_number();
    let issued_at = now_iso();

    // Everything the certificate needs is copied now; the student row may be
    // edited or deleted afterwards without touching this record.
    if let Err(e) = conn.execute(
        "INSERT INTO certificates(
            id, serial_no, student_id, student_name, admission_no, class_name, section,
            dob, gender, father_name, mother_name, category, religion, admitted_at,
            leaving_reason, conduct, remarks, issued_at
         ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
        rusqlite::params![
            certificate_id,
            serial_no,
            student_id,
            name,
            admission_no,
            class_name,
            section,
            dob,
            gender,
            father_name,
            mother_name,
            category,
            religion,
            admitted_at,
            optional_str(req, "leavingReason"),
            optional_str(req, "conduct").or_else(|| Some("Good".to_string())),
            optional_str(req, "remarks"),
            issued_at,
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "certificates" })),
        );
    }

    ok(
        &req.id,
        json!({
            "certificateId": certificate_id,
            "serialNo": serial_no,
            "issuedAt": issued_at
        }),
    )
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let sql = format!(
        "SELECT {} FROM certificates ORDER BY issued_at DESC",
        CERT_COLUMNS
    );
    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], certificate_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(certificates) => ok(&req.id, json!({ "certificates": certificates })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let certificate_id = match required_str(req, "certificateId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match load_certificate(conn, req, &certificate_id) {
        Ok(certificate) => ok(&req.id, json!({ "certificate": certificate })),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tc.generate" => Some(handle_generate(state, req)),
        "tc.list" => Some(handle_list(state, req)),
        "tc.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
