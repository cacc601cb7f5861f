use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, now_iso, optional_i64, optional_str, require_admin, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::{params_from_iter, types::Value, OptionalExtension, Row};
use serde_json::json;
use uuid::Uuid;

fn previous_marks_json(params: &serde_json::Value) -> String {
    let marks = params
        .get("previousMarks")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| {
                    let subject = m.get("subject").and_then(|v| v.as_str())?;
                    let marks = m.get("marks").and_then(|v| v.as_f64())?;
                    Some(json!({ "subject": subject, "marks": marks }))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    serde_json::to_string(&marks).unwrap_or_else(|_| "[]".to_string())
}

fn student_json(row: &Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let previous_marks: String = row.get(19)?;
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "name": row.get::<_, String>(1)?,
        "admissionNo": row.get::<_, String>(2)?,
        "tempRollNo": row.get::<_, Option<String>>(3)?,
        "permRollNo": row.get::<_, Option<String>>(4)?,
        "dob": row.get::<_, Option<String>>(5)?,
        "gender": row.get::<_, Option<String>>(6)?,
        "religion": row.get::<_, Option<String>>(7)?,
        "category": row.get::<_, Option<String>>(8)?,
        "bloodGroup": row.get::<_, Option<String>>(9)?,
        "fatherName": row.get::<_, Option<String>>(10)?,
        "motherName": row.get::<_, Option<String>>(11)?,
        "guardianPhone": row.get::<_, Option<String>>(12)?,
        "guardianEmail": row.get::<_, Option<String>>(13)?,
        "address": row.get::<_, Option<String>>(14)?,
        "className": row.get::<_, String>(15)?,
        "section": row.get::<_, Option<String>>(16)?,
        "facilityType": row.get::<_, Option<String>>(17)?,
        "previousSchool": row.get::<_, Option<String>>(18)?,
        "previousMarks": serde_json::from_str::<serde_json::Value>(&previous_marks)
            .unwrap_or_else(|_| json!([])),
        "photoPath": row.get::<_, Option<String>>(20)?,
        "photoUrl": row.get::<_, Option<String>>(21)?,
        "feeStartDate": row.get::<_, Option<String>>(22)?,
        "feeDueDay": row.get::<_, Option<i64>>(23)?,
        "customFeeStructure": row.get::<_, i64>(24)? != 0,
        "active": row.get::<_, i64>(25)? != 0,
        "admittedAt": row.get::<_, String>(26)?,
        "updatedAt": row.get::<_, Option<String>>(27)?,
    }))
}

const STUDENT_COLUMNS: &str = "id, name, admission_no, temp_roll_no, perm_roll_no, dob, gender,
    religion, category, blood_group, father_name, mother_name, guardian_phone, guardian_email,
    address, class_name, section, facility_type, previous_school, previous_marks, photo_path,
    photo_url, fee_start_date, fee_due_day, custom_fee_structure, active, admitted_at, updated_at";

fn handle_admit(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let admission_no = match required_str(req, "admissionNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_name = match required_str(req, "className") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM students WHERE admission_no = ?",
            [&admission_no],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_some() {
        return err(
            &req.id,
            "duplicate_admission_no",
            "a student with this admission number already exists",
            Some(json!({ "admissionNo": admission_no })),
        );
    }

    let student_id = Uuid::new_v4().to_string();
    let result = conn.execute(
        "INSERT INTO students(
            id, name, admission_no, temp_roll_no, perm_roll_no, dob, gender, religion,
            category, blood_group, father_name, mother_name, guardian_phone, guardian_email,
            address, class_name, section, facility_type, previous_school, previous_marks,
            photo_path, photo_url, fee_start_date, fee_due_day, custom_fee_structure,
            active, admitted_at
         ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,1,?)",
        rusqlite::params![
            student_id,
            name,
            admission_no,
            optional_str(req, "tempRollNo"),
            optional_str(req, "permRollNo"),
            optional_str(req, "dob"),
            optional_str(req, "gender"),
            optional_str(req, "religion"),
            optional_str(req, "category"),
            optional_str(req, "bloodGroup"),
            optional_str(req, "fatherName"),
            optional_str(req, "motherName"),
            optional_str(req, "guardianPhone"),
            optional_str(req, "guardianEmail"),
            optional_str(req, "address"),
            class_name,
            optional_str(req, "section"),
            optional_str(req, "facilityType"),
            optional_str(req, "previousSchool"),
            previous_marks_json(&req.params),
            optional_str(req, "photoPath"),
            optional_str(req, "photoUrl"),
            optional_str(req, "feeStartDate"),
            optional_i64(req, "feeDueDay"),
            req.params
                .get("customFeeStructure")
                .and_then(|v| v.as_bool())
                .unwrap_or(false) as i64,
            now_iso(),
        ],
    );
    if let Err(e) = result {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(
        &req.id,
        json!({ "studentId": student_id, "admissionNo": admission_no }),
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

    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(class_name) = optional_str(req, "className") {
        clauses.push("class_name = ?".to_string());
        binds.push(Value::Text(class_name));
    }
    if let Some(section) = optional_str(req, "section") {
        clauses.push("section = ?".to_string());
        binds.push(Value::Text(section));
    }
    if let Some(active) = req.params.get("active").and_then(|v| v.as_bool()) {
        clauses.push("active = ?".to_string());
        binds.push(Value::Integer(active as i64));
    }
    if let Some(search) = optional_str(req, "search") {
        clauses.push("(name LIKE ? OR admission_no LIKE ?)".to_string());
        let pat = format!("%{}%", search);
        binds.push(Value::Text(pat.clone()));
        binds.push(Value::Text(pat));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM students {} ORDER BY class_name, name",
        STUDENT_COLUMNS, where_sql
    );

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(binds), student_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(students) => ok(&req.id, json!({ "students": students })),
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
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    let row = match conn
        .query_row(&sql, [&student_id], student_json)
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    match row {
        Some(student) => ok(&req.id, json!({ "student": student })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

const UPDATABLE_TEXT_FIELDS: [(&str, &str); 18] = [
    ("name", "name"),
    ("tempRollNo", "temp_roll_no"),
    ("permRollNo", "perm_roll_no"),
    ("dob", "dob"),
    ("gender", "gender"),
    ("religion", "religion"),
    ("category", "category"),
    ("bloodGroup", "blood_group"),
    ("fatherName", "father_name"),
    ("motherName", "mother_name"),
    ("guardianPhone", "guardian_phone"),
    ("guardianEmail", "guardian_email"),
    ("address", "address"),
    ("className", "class_name"),
    ("section", "section"),
    ("facilityType", "facility_type"),
    ("previousSchool", "previous_school"),
    ("feeStartDate", "fee_start_date"),
];

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    for (param, column) in UPDATABLE_TEXT_FIELDS {
        if let Some(v) = optional_str(req, param) {
            sets.push(format!("{} = ?", column));
            binds.push(Value::Text(v));
        }
    }
    if req.params.get("previousMarks").is_some() {
        sets.push("previous_marks = ?".to_string());
        binds.push(Value::Text(previous_marks_json(&req.params)));
    }
    if let Some(day) = optional_i64(req, "feeDueDay") {
        sets.push("fee_due_day = ?".to_string());
        binds.push(Value::Integer(day));
    }
    if let Some(custom) = req.params.get("customFeeStructure").and_then(|v| v.as_bool()) {
        sets.push("custom_fee_structure = ?".to_string());
        binds.push(Value::Integer(custom as i64));
    }
    if let Some(active) = req.params.get("active").and_then(|v| v.as_bool()) {
        sets.push("active = ?".to_string());
        binds.push(Value::Integer(active as i64));
    }
    if let Some(path) = optional_str(req, "photoPath") {
        sets.push("photo_path = ?".to_string());
        binds.push(Value::Text(path));
    }
    if let Some(url) = optional_str(req, "photoUrl") {
        sets.push("photo_url = ?".to_string());
        binds.push(Value::Text(url));
    }

    if sets.is_empty() {
        return err(&req.id, "bad_params", "no fields to update", None);
    }
    sets.push("updated_at = ?".to_string());
    binds.push(Value::Text(now_iso()));
    binds.push(Value::Text(student_id.clone()));

    let sql = format!("UPDATE students SET {} WHERE id = ?", sets.join(", "));
    if let Err(e) = conn.execute(&sql, params_from_iter(binds)) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let workspace = state.workspace.clone();
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let photo_path: Option<Option<String>> = match conn
        .query_row(
            "SELECT photo_path FROM students WHERE id = ?",
            [&student_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(photo_path) = photo_path else {
        return err(&req.id, "not_found", "student not found", None);
    };

    // Fees and payments for the student are left in place; the admin removes
    // them separately if needed.
    if let Err(e) = conn.execute("DELETE FROM students WHERE id = ?", [&student_id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    if let (Some(ws), Some(path)) = (workspace, photo_path) {
        store::delete_quiet(&ws, &path);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.admit" => Some(handle_admit(state, req)),
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
