use crate::docs;
use crate::fees;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use chrono::{Datelike, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use super::certificates;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn month_name(month: i64) -> &'static str {
    MONTH_NAMES
        .get((month - 1).clamp(0, 11) as usize)
        .copied()
        .unwrap_or("Unknown")
}

fn count(conn: &Connection, sql: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(sql, [], |r| r.get(0))
}

fn school_profile(conn: &Connection) -> serde_json::Value {
    crate::db::settings_get_json(conn, "school.profile")
        .ok()
        .flatten()
        .unwrap_or_else(|| json!({}))
}

fn handle_dashboard_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let totals = (|| -> Result<serde_json::Value, rusqlite::Error> {
        let students = count(conn, "SELECT COUNT(*) FROM students WHERE active = 1")?;
        let staff = count(conn, "SELECT COUNT(*) FROM staff")?;
        let classes = count(conn, "SELECT COUNT(*) FROM classes")?;
        let notices = count(conn, "SELECT COUNT(*) FROM notices")?;
        let events = count(conn, "SELECT COUNT(*) FROM events")?;
        let gallery = count(conn, "SELECT COUNT(*) FROM gallery_photos")?;
        let certificates = count(conn, "SELECT COUNT(*) FROM certificates")?;
        let pending = count(conn, "SELECT COUNT(*) FROM fees WHERE status = 'pending'")?;
        let paid = count(conn, "SELECT COUNT(*) FROM fees WHERE status = 'paid'")?;

        let today = Utc::now().date_naive();
        let overdue: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fees WHERE status = 'pending' AND due_date < ?",
            [today.format("%Y-%m-%d").to_string()],
            |r| r.get(0),
        )?;
        let month_prefix = format!("{:04}-{:02}%", today.year(), today.month());
        let collected_this_month: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM fee_payments WHERE paid_at LIKE ?",
            [month_prefix],
            |r| r.get(0),
        )?;

        Ok(json!({
            "students": students,
            "staff": staff,
            "classes": classes,
            "notices": notices,
            "events": events,
            "galleryPhotos": gallery,
            "certificates": certificates,
            "fees": {
                "pending": pending,
                "paid": paid,
                "overdue": overdue,
                "collectedThisMonth": collected_this_month
            }
        }))
    })();

    match totals {
        Ok(model) => ok(&req.id, model),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_fee_receipt_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let payment_id = match required_str(req, "paymentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    type PaymentRow = (
        String,
        String,
        f64,
        String,
        Option<String>,
        String,
        f64,
        f64,
        String,
    );
    let payment: Option<PaymentRow> = match conn
        .query_row(
            "SELECT fee_id, student_id, amount, method, cheque_no, receipt_no,
                    discount_amount, additional_total, paid_at
             FROM fee_payments WHERE id = ?",
            [&payment_id],
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
                ))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((
        fee_id,
        student_id,
        amount_paid,
        method,
        cheque_no,
        receipt_no,
        discount_amount,
        additional_total,
        paid_at,
    )) = payment
    else {
        return err(&req.id, "not_found", "payment not found", None);
    };

    type FeeRow = (i64, i64, f64, Option<String>, Option<f64>, f64, String, f64);
    let fee: Option<FeeRow> = match conn
        .query_row(
            "SELECT month, year, amount, discount_type, discount_percent, final_amount,
                    additional_fees, total_amount
             FROM fees WHERE id = ?",
            [&fee_id],
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
                ))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((month, year, amount, discount_type, discount_percent, final_amount, additional_raw, total_amount)) =
        fee
    else {
        return err(&req.id, "not_found", "fee for payment not found", None);
    };

    let additional = match fees::parse_additional_fees(&additional_raw) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    // The student row may be gone; the receipt still renders with the id.
    let student: Option<(String, String, String, Option<String>)> = match conn
        .query_row(
            "SELECT name, admission_no, class_name, section FROM students WHERE id = ?",
            [&student_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let (student_name, admission_no, class_name, section) = student.unwrap_or((
        format!("Student {}", student_id),
        String::new(),
        String::new(),
        None,
    ));

    ok(
        &req.id,
        json!({
            "school": school_profile(conn),
            "receiptNo": receipt_no,
            "paidAt": paid_at,
            "method": method,
            "chequeNo": cheque_no,
            "student": {
                "id": student_id,
                "name": student_name,
                "admissionNo": admission_no,
                "className": class_name,
                "section": section
            },
            "fee": {
                "id": fee_id,
                "month": month,
                "monthName": month_name(month),
                "year": year,
                "amount": amount,
                "discountType": discount_type,
                "discountPercent": discount_percent,
                "discountAmount": discount_amount,
                "finalAmount": final_amount,
                "additionalFees": additional,
                "additionalTotal": additional_total,
                "totalAmount": total_amount
            },
            "amountPaid": amount_paid,
            "amountInWords": docs::amount_in_words(amount_paid),
            "fileName": docs::document_file_name(&student_name, &receipt_no)
        }),
    )
}

fn handle_tc_model(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let cert = match certificates::load_certificate(conn, req, &certificate_id) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let gender = cert.get("gender").and_then(|v| v.as_str());
    let pronouns = docs::pronoun_set(gender);
    let student_name = cert
        .get("studentName")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let serial_no = cert
        .get("serialNo")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let dob = cert.get("dob").and_then(|v| v.as_str());

    ok(
        &req.id,
        json!({
            "school": school_profile(conn),
            "certificate": cert,
            "pronouns": pronouns,
            "dobInWords": dob.map(docs::date_in_words),
            "fileName": docs::document_file_name(&student_name, &serial_no)
        }),
    )
}

fn handle_fee_defaulters_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let mut stmt = match conn.prepare(
        "SELECT f.id, f.student_id, s.name, s.admission_no, s.class_name, s.section,
                f.month, f.year, f.total_amount, f.due_date
         FROM fees f
         LEFT JOIN students s ON s.id = f.student_id
         WHERE f.status = 'pending' AND f.due_date < ?
         ORDER BY f.due_date, s.class_name, s.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([&today], |r| {
            let month: i64 = r.get(6)?;
            Ok(json!({
                "feeId": r.get::<_, String>(0)?,
                "studentId": r.get::<_, String>(1)?,
                "studentName": r.get::<_, Option<String>>(2)?,
                "admissionNo": r.get::<_, Option<String>>(3)?,
                "className": r.get::<_, Option<String>>(4)?,
                "section": r.get::<_, Option<String>>(5)?,
                "month": month,
                "monthName": month_name(month),
                "year": r.get::<_, i64>(7)?,
                "totalAmount": r.get::<_, f64>(8)?,
                "dueDate": r.get::<_, String>(9)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(defaulters) => ok(
            &req.id,
            json!({ "asOf": today, "defaulters": defaulters }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_school_profile_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(profile) = req.params.get("profile").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing profile object", None);
    };
    match crate::db::settings_set_json(conn, "school.profile", profile) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.dashboardModel" => Some(handle_dashboard_model(state, req)),
        "reports.feeReceiptModel" => Some(handle_fee_receipt_model(state, req)),
        "reports.transferCertificateModel" => Some(handle_tc_model(state, req)),
        "reports.feeDefaultersModel" => Some(handle_fee_defaulters_model(state, req)),
        "school.profileSet" => Some(handle_school_profile_set(state, req)),
        _ => None,
    }
}
