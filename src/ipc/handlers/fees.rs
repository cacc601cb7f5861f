use crate::fees;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, now_iso, optional_i64, optional_str, require_admin, required_f64, required_i64,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::{params_from_iter, types::Value, OptionalExtension, Row};
use serde_json::json;
use uuid::Uuid;

const FEE_COLUMNS: &str = "id, student_id, month, year, amount, discount_type, discount_percent,
    discount_amount, final_amount, additional_fees, total_amount, due_date, status, created_at";

fn fee_json(row: &Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let additional: String = row.get(9)?;
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "studentId": row.get::<_, String>(1)?,
        "month": row.get::<_, i64>(2)?,
        "year": row.get::<_, i64>(3)?,
        "amount": row.get::<_, f64>(4)?,
        "discountType": row.get::<_, Option<String>>(5)?,
        "discountPercent": row.get::<_, Option<f64>>(6)?,
        "discountAmount": row.get::<_, f64>(7)?,
        "finalAmount": row.get::<_, f64>(8)?,
        "additionalFees": serde_json::from_str::<serde_json::Value>(&additional)
            .unwrap_or_else(|_| json!([])),
        "totalAmount": row.get::<_, f64>(10)?,
        "dueDate": row.get::<_, String>(11)?,
        "status": row.get::<_, String>(12)?,
        "createdAt": row.get::<_, String>(13)?,
    }))
}

fn fee_err(req: &Request, e: fees::FeeError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

fn handle_structure_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // One class name, or the whole table for the public fees page.
    if let Some(class_name) = optional_str(req, "className") {
        return match fees::structure_for_class(conn, &class_name) {
            Ok(Some(row)) => ok(
                &req.id,
                json!({
                    "className": class_name,
                    "tuitionFee": row.tuition_fee,
                    "examFee": row.exam_fee,
                    "sportsFee": row.sports_fee,
                    "baseFee": row.base_fee()
                }),
            ),
            Ok(None) => ok(
                &req.id,
                json!({
                    "className": class_name,
                    "baseFee": fees::DEFAULT_BASE_FEE,
                    "fallback": true
                }),
            ),
            Err(e) => fee_err(req, e),
        };
    }

    let mut stmt = match conn.prepare(
        "SELECT class_name, tuition_fee, exam_fee, sports_fee
         FROM fee_structure ORDER BY class_name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            let class_name: String = r.get(0)?;
            let tuition: f64 = r.get(1)?;
            let exam: f64 = r.get(2)?;
            let sports: f64 = r.get(3)?;
            Ok(json!({
                "className": class_name,
                "tuitionFee": tuition,
                "examFee": exam,
                "sportsFee": sports,
                "baseFee": tuition + exam + sports
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(structure) => ok(&req.id, json!({ "structure": structure })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_structure_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_name = match required_str(req, "className") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let tuition = match required_f64(req, "tuitionFee") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = match required_f64(req, "examFee") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let sports = match required_f64(req, "sportsFee") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if tuition < 0.0 || exam < 0.0 || sports < 0.0 {
        return err(&req.id, "bad_params", "fee amounts must not be negative", None);
    }

    if let Err(e) = conn.execute(
        "INSERT INTO fee_structure(class_name, tuition_fee, exam_fee, sports_fee)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(class_name) DO UPDATE SET
           tuition_fee = excluded.tuition_fee,
           exam_fee = excluded.exam_fee,
           sports_fee = excluded.sports_fee",
        (&class_name, tuition, exam, sports),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "fee_structure" })),
        );
    }

    ok(
        &req.id,
        json!({ "className": class_name, "baseFee": tuition + exam + sports }),
    )
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
    let month = match required_i64(req, "month") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match required_i64(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !(1..=12).contains(&month) {
        return err(&req.id, "bad_params", "month must be 1..=12", None);
    }

    let student: Option<(String, Option<i64>)> = match conn
        .query_row(
            "SELECT class_name, fee_due_day FROM students WHERE id = ?",
            [&student_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((class_name, fee_due_day)) = student else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let existing: Option<String> = match conn
        .query_row(
            "SELECT id FROM fees WHERE student_id = ? AND month = ? AND year = ?",
            (&student_id, month, year),
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Some(fee_id) = existing {
        return err(
            &req.id,
            "duplicate_fee",
            "a fee already exists for this student and month",
            Some(json!({ "feeId": fee_id, "month": month, "year": year })),
        );
    }

    let amount = match fees::base_fee_for_class(conn, &class_name) {
        Ok(v) => v,
        Err(e) => return fee_err(req, e),
    };
    let due = match fees::due_date(year as i32, month as u32, fee_due_day.map(|d| d as u32)) {
        Ok(v) => v,
        Err(e) => return fee_err(req, e),
    };

    let fee_id = Uuid::new_v4().to_string();
    let insert = conn.execute(
        "INSERT INTO fees(
            id, student_id, month, year, amount, discount_amount, final_amount,
            additional_fees, total_amount, due_date, status, created_at
         ) VALUES (?, ?, ?, ?, ?, 0, ?, '[]', ?, ?, 'pending', ?)",
        rusqlite::params![
            fee_id,
            student_id,
            month,
            year,
            amount,
            amount,
            amount,
            due.format("%Y-%m-%d").to_string(),
            now_iso(),
        ],
    );
    if let Err(e) = insert {
        // The UNIQUE(student_id, month, year) constraint also catches a racing
        // insert between the check above and this write.
        let msg = e.to_string();
        if msg.contains("UNIQUE") {
            return err(
                &req.id,
                "duplicate_fee",
                "a fee already exists for this student and month",
                Some(json!({ "month": month, "year": year })),
            );
        }
        return err(
            &req.id,
            "db_insert_failed",
            msg,
            Some(json!({ "table": "fees" })),
        );
    }

    ok(
        &req.id,
        json!({
            "feeId": fee_id,
            "amount": amount,
            "dueDate": due.format("%Y-%m-%d").to_string()
        }),
    )
}

fn load_fee(
    conn: &rusqlite::Connection,
    req: &Request,
    fee_id: &str,
) -> Result<serde_json::Value, serde_json::Value> {
    let sql = format!("SELECT {} FROM fees WHERE id = ?", FEE_COLUMNS);
    conn.query_row(&sql, [fee_id], fee_json)
        .optional()
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?
        .ok_or_else(|| err(&req.id, "not_found", "fee not found", None))
}

fn handle_apply_discount(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let fee_id = match required_str(req, "feeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let discount_type = match required_str(req, "discountType") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let percent = match required_f64(req, "percent") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(dt) = fees::DiscountType::parse(&discount_type) else {
        return err(
            &req.id,
            "bad_params",
            "discountType must be one of: sibling, staff_ward, merit, financial_aid, other",
            Some(json!({ "discountType": discount_type })),
        );
    };
    if !(0.0..=100.0).contains(&percent) {
        return err(&req.id, "bad_params", "percent must be 0..=100", None);
    }

    let fee = match load_fee(conn, req, &fee_id) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let amount = fee.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let discount_amount = fees::discount_amount(amount, percent);
    let final_amount = fees::final_amount(amount, percent);

    if let Err(e) = conn.execute(
        "UPDATE fees
         SET discount_type = ?, discount_percent = ?, discount_amount = ?, final_amount = ?
         WHERE id = ?",
        (dt.as_str(), percent, discount_amount, final_amount, &fee_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "fees" })),
        );
    }

    ok(
        &req.id,
        json!({
            "feeId": fee_id,
            "discountAmount": discount_amount,
            "finalAmount": final_amount
        }),
    )
}

fn current_additional(
    conn: &rusqlite::Connection,
    req: &Request,
    fee_id: &str,
) -> Result<(f64, Vec<fees::AdditionalFee>), serde_json::Value> {
    let row: Option<(f64, String)> = conn
        .query_row(
            "SELECT amount, additional_fees FROM fees WHERE id = ?",
            [fee_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
    let Some((amount, raw)) = row else {
        return Err(err(&req.id, "not_found", "fee not found", None));
    };
    let adds = fees::parse_additional_fees(&raw).map_err(|e| fee_err(req, e))?;
    Ok((amount, adds))
}

fn write_additional(
    conn: &rusqlite::Connection,
    req: &Request,
    fee_id: &str,
    amount: f64,
    adds: &[fees::AdditionalFee],
) -> Result<f64, serde_json::Value> {
    let total = fees::total_amount(amount, adds);
    let raw = serde_json::to_string(adds)
        .map_err(|e| err(&req.id, "db_update_failed", e.to_string(), None))?;
    conn.execute(
        "UPDATE fees SET additional_fees = ?, total_amount = ? WHERE id = ?",
        (&raw, total, fee_id),
    )
    .map_err(|e| {
        err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "fees" })),
        )
    })?;
    Ok(total)
}

fn handle_add_additional(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let fee_id = match required_str(req, "feeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match required_str(req, "kind") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let frequency = match required_str(req, "frequency") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let amount = match required_f64(req, "amount") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(kind) = fees::AdditionalFeeKind::parse(&kind) else {
        return err(
            &req.id,
            "bad_params",
            "kind must be one of: registration, lab, library, activity",
            None,
        );
    };
    let Some(frequency) = fees::FeeFrequency::parse(&frequency) else {
        return err(
            &req.id,
            "bad_params",
            "frequency must be one of: one_time, annual, monthly",
            None,
        );
    };
    if amount < 0.0 {
        return err(&req.id, "bad_params", "amount must not be negative", None);
    }

    let (base, mut adds) = match current_additional(conn, req, &fee_id) {
        Ok(v) => v,
        Err(e) => return e,
    };
    adds.push(fees::AdditionalFee {
        kind,
        frequency,
        amount,
    });
    let total = match write_additional(conn, req, &fee_id, base, &adds) {
        Ok(v) => v,
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!({ "feeId": fee_id, "totalAmount": total, "additionalCount": adds.len() }),
    )
}

fn handle_remove_additional(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let fee_id = match required_str(req, "feeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let index = match required_i64(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let (base, mut adds) = match current_additional(conn, req, &fee_id) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if index < 0 || index as usize >= adds.len() {
        return err(
            &req.id,
            "bad_params",
            "additional fee index out of range",
            Some(json!({ "index": index, "count": adds.len() })),
        );
    }
    adds.remove(index as usize);
    let total = match write_additional(conn, req, &fee_id, base, &adds) {
        Ok(v) => v,
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!({ "feeId": fee_id, "totalAmount": total, "additionalCount": adds.len() }),
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

    let status_filter = optional_str(req, "status");
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(student_id) = optional_str(req, "studentId") {
        clauses.push("student_id = ?".to_string());
        binds.push(Value::Text(student_id));
    }
    if let Some(month) = optional_i64(req, "month") {
        clauses.push("month = ?".to_string());
        binds.push(Value::Integer(month));
    }
    if let Some(year) = optional_i64(req, "year") {
        clauses.push("year = ?".to_string());
        binds.push(Value::Integer(year));
    }
    match status_filter.as_deref() {
        // Overdue is pending-past-due, classified against today, not stored.
        Some("overdue") | None => {}
        Some(s @ ("pending" | "paid")) => {
            clauses.push("status = ?".to_string());
            binds.push(Value::Text(s.to_string()));
        }
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                "status must be one of: pending, paid, overdue",
                Some(json!({ "status": other })),
            )
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM fees {} ORDER BY year DESC, month DESC",
        FEE_COLUMNS, where_sql
    );

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(binds), fee_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let mut fees_out = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let today = Utc::now().date_naive();
    for fee in fees_out.iter_mut() {
        let status = fee.get("status").and_then(|v| v.as_str()).unwrap_or("");
        let due = fee.get("dueDate").and_then(|v| v.as_str()).unwrap_or("");
        let overdue = fees::is_overdue(status, due, today);
        if let Some(obj) = fee.as_object_mut() {
            obj.insert("overdue".to_string(), json!(overdue));
        }
    }
    if status_filter.as_deref() == Some("overdue") {
        fees_out.retain(|f| f.get("overdue").and_then(|v| v.as_bool()) == Some(true));
    }

    ok(&req.id, json!({ "fees": fees_out }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let fee_id = match required_str(req, "feeId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let affected = match conn.execute("DELETE FROM fees WHERE id = ?", [&fee_id]) {
        Ok(n) => n,
        Err(e) => {
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": "fees" })),
            )
        }
    };
    if affected == 0 {
        return err(&req.id, "not_found", "fee not found", None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "feeStructure.get" => Some(handle_structure_get(state, req)),
        "feeStructure.set" => Some(handle_structure_set(state, req)),
        "fees.generate" => Some(handle_generate(state, req)),
        "fees.applyDiscount" => Some(handle_apply_discount(state, req)),
        "fees.addAdditionalFee" => Some(handle_add_additional(state, req)),
        "fees.removeAdditionalFee" => Some(handle_remove_additional(state, req)),
        "fees.list" => Some(handle_list(state, req)),
        "fees.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
