use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, optional_str, require_admin, required_f64, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use uuid::Uuid;

/// Records a checkout result exactly as the client-side gateway widget
/// reported it. No signature verification happens here.
fn handle_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = match required_str(req, "studentName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let amount = match required_f64(req, "amount") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if amount <= 0.0 {
        return err(&req.id, "bad_params", "amount must be positive", None);
    }

    let order_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO orders(id, student_name, purpose, amount, gateway_payment_id, status, created_at)
         VALUES(?, ?, ?, ?, ?, 'recorded', ?)",
        rusqlite::params![
            order_id,
            student_name,
            optional_str(req, "purpose"),
            amount,
            optional_str(req, "gatewayPaymentId"),
            now_iso(),
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "orders" })),
        );
    }

    ok(&req.id, json!({ "orderId": order_id }))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut stmt = match conn.prepare(
        "SELECT id, student_name, purpose, amount, gateway_payment_id, status, created_at
         FROM orders ORDER BY created_at DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "studentName": r.get::<_, String>(1)?,
                "purpose": r.get::<_, Option<String>>(2)?,
                "amount": r.get::<_, f64>(3)?,
                "gatewayPaymentId": r.get::<_, Option<String>>(4)?,
                "status": r.get::<_, String>(5)?,
                "createdAt": r.get::<_, String>(6)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(orders) => ok(&req.id, json!({ "orders": orders })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "orders.record" => Some(handle_record(state, req)),
        "orders.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
