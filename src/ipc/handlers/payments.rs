use crate::docs;
use crate::fees;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, optional_str, require_admin, required_f64, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn parse_method(s: &str) -> Option<&'static str> {
    match s {
        "cash" => Some("cash"),
        "cheque" => Some("cheque"),
        "online" => Some("online"),
        _ => None,
    }
}

fn handle_record(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let amount = match required_f64(req, "amount") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let method_raw = match required_str(req, "method") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(method) = parse_method(&method_raw) else {
        return err(
            &req.id,
            "bad_params",
            "method must be one of: cash, cheque, online",
            Some(json!({ "method": method_raw })),
        );
    };
    let cheque_no = optional_str(req, "chequeNo");
    if method == "cheque" && cheque_no.is_none() {
        return err(&req.id, "bad_params", "chequeNo required for cheque payments", None);
    }
    if amount <= 0.0 {
        return err(&req.id, "bad_params", "amount must be positive", None);
    }

    let fee: Option<(String, String, f64, f64, String)> = match conn
        .query_row(
            "SELECT student_id, status, discount_amount, total_amount, additional_fees
             FROM fees WHERE id = ?",
            [&fee_id],
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
    let Some((student_id, status, discount_amount, _total, additional_raw)) = fee else {
        return err(&req.id, "not_found", "fee not found", None);
    };
    if status == "paid" {
        return err(
            &req.id,
            "bad_params",
            "fee is already paid",
            Some(json!({ "feeId": fee_id })),
        );
    }

    let additional_total = match fees::parse_additional_fees(&additional_raw) {
        Ok(adds) => adds.iter().map(|a| a.amount).sum::<f64>(),
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let payment_id = Uuid::new_v4().to_string();
    let receipt_no = docs::receipt_number();
    let paid_at = now_iso();

    // Payment insert and status flip succeed or fail together.
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = tx.execute(
        "INSERT INTO fee_payments(
            id, fee_id, student_id, amount, method, cheque_no, receipt_no,
            discount_amount, additional_total, paid_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            payment_id,
            fee_id,
            student_id,
            amount,
            method,
            cheque_no,
            receipt_no,
            discount_amount,
            additional_total,
            paid_at,
        ],
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "fee_payments" })),
        );
    }
    if let Err(e) = tx.execute("UPDATE fees SET status = 'paid' WHERE id = ?", [&fee_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "fees" })),
        );
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "paymentId": payment_id,
            "receiptNo": receipt_no,
            "paidAt": paid_at
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

    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(student_id) = optional_str(req, "studentId") {
        clauses.push("student_id = ?".to_string());
        binds.push(Value::Text(student_id));
    }
    if let Some(fee_id) = optional_str(req, "feeId") {
        clauses.push("fee_id = ?".to_string());
        binds.push(Value::Text(fee_id));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT id, fee_id, student_id, amount, method, cheque_no, receipt_no,
                discount_amount, additional_total, paid_at
         FROM fee_payments {} ORDER BY paid_at DESC",
        where_sql
    );

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(binds), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "feeId": r.get::<_, String>(1)?,
                "studentId": r.get::<_, String>(2)?,
                "amount": r.get::<_, f64>(3)?,
                "method": r.get::<_, String>(4)?,
                "chequeNo": r.get::<_, Option<String>>(5)?,
                "receiptNo": r.get::<_, String>(6)?,
                "discountAmount": r.get::<_, f64>(7)?,
                "additionalTotal": r.get::<_, f64>(8)?,
                "paidAt": r.get::<_, String>(9)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(payments) => ok(&req.id, json!({ "payments": payments })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.record" => Some(handle_record(state, req)),
        "payments.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
