use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::OptionalExtension;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn password_hash(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let row: Option<(String, String)> = match conn
        .query_row(
            "SELECT password_hash, role FROM admin_users WHERE email = ?",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // Any identity outside admin_users is signed out, not just rejected.
    let Some((stored_hash, role)) = row else {
        state.session = None;
        return err(&req.id, "unauthorized", "not an authorized admin", None);
    };
    if stored_hash != password_hash(&password) {
        state.session = None;
        return err(&req.id, "unauthorized", "invalid credentials", None);
    }

    let token = Uuid::new_v4().to_string();
    state.session = Some(Session {
        token: token.clone(),
        email: email.clone(),
    });
    tracing::info!(email = %email, "admin login");
    ok(&req.id, json!({ "session": token, "email": email, "role": role }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "ok": true }))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    match &state.session {
        Some(s) => ok(&req.id, json!({ "email": s.email })),
        None => ok(&req.id, json!({ "email": null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
