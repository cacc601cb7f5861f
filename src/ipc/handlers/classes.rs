use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_i64, optional_str, require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn string_array(params: &serde_json::Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // Student counts ride along so the dashboard needs no second query.
    // Students reference classes by name, so the subquery matches on name.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.sections,
           c.subjects,
           c.schedule,
           c.section_capacity,
           (SELECT COUNT(*) FROM students s WHERE s.class_name = c.name AND s.active = 1)
             AS student_count
         FROM classes c
         ORDER BY c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let sections: String = row.get(2)?;
            let subjects: String = row.get(3)?;
            let schedule: Option<String> = row.get(4)?;
            let capacity: Option<i64> = row.get(5)?;
            let student_count: i64 = row.get(6)?;
            Ok(json!({
                "id": id,
                "name": name,
                "sections": serde_json::from_str::<serde_json::Value>(&sections)
                    .unwrap_or_else(|_| json!([])),
                "subjects": serde_json::from_str::<serde_json::Value>(&subjects)
                    .unwrap_or_else(|_| json!([])),
                "schedule": schedule,
                "sectionCapacity": capacity,
                "studentCount": student_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM classes WHERE name = ?", [&name], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_some() {
        return err(
            &req.id,
            "duplicate_class",
            "a class with this name already exists",
            Some(json!({ "name": name })),
        );
    }

    let sections = string_array(&req.params, "sections");
    let subjects = string_array(&req.params, "subjects");
    let schedule = optional_str(req, "schedule");
    let capacity = optional_i64(req, "sectionCapacity");

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO classes(id, name, sections, subjects, schedule, section_capacity)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &class_id,
            &name,
            serde_json::to_string(&sections).unwrap_or_else(|_| "[]".to_string()),
            serde_json::to_string(&subjects).unwrap_or_else(|_| "[]".to_string()),
            &schedule,
            capacity,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    ok(&req.id, json!({ "classId": class_id, "name": name }))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let current: Option<(String, String, String, Option<String>, Option<i64>)> = match conn
        .query_row(
            "SELECT name, sections, subjects, schedule, section_capacity
             FROM classes WHERE id = ?",
            [&class_id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                ))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((cur_name, cur_sections, cur_subjects, cur_schedule, cur_capacity)) = current else {
        return err(&req.id, "not_found", "class not found", None);
    };

    let name = optional_str(req, "name").unwrap_or(cur_name);
    let sections = if req.params.get("sections").is_some() {
        serde_json::to_string(&string_array(&req.params, "sections"))
            .unwrap_or_else(|_| "[]".to_string())
    } else {
        cur_sections
    };
    let subjects = if req.params.get("subjects").is_some() {
        serde_json::to_string(&string_array(&req.params, "subjects"))
            .unwrap_or_else(|_| "[]".to_string())
    } else {
        cur_subjects
    };
    let schedule = optional_str(req, "schedule").or(cur_schedule);
    let capacity = optional_i64(req, "sectionCapacity").or(cur_capacity);

    if let Err(e) = conn.execute(
        "UPDATE classes
         SET name = ?, sections = ?, subjects = ?, schedule = ?, section_capacity = ?
         WHERE id = ?",
        (&name, &sections, &subjects, &schedule, capacity, &class_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    ok(&req.id, json!({ "classId": class_id, "name": name }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let name: Option<String> = match conn
        .query_row("SELECT name FROM classes WHERE id = ?", [&class_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(name) = name else {
        return err(&req.id, "not_found", "class not found", None);
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // The fee-structure row goes with the class. Students keep their
    // class_name string; the reference is by name and may dangle.
    if let Err(e) = tx.execute("DELETE FROM fee_structure WHERE class_name = ?", [&name]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "fee_structure" })),
        );
    }
    if let Err(e) = tx.execute("DELETE FROM classes WHERE id = ?", [&class_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
