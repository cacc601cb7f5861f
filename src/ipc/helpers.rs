use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

use super::error::err;
use super::types::{AppState, Request};

pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_i64(req: &Request, key: &str) -> Option<i64> {
    req.params.get(key).and_then(|v| v.as_i64())
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn workspace_path(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    state
        .workspace
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Admin gate: `params.session` must match the live session token. Public
/// read methods skip this.
pub fn require_admin(state: &AppState, req: &Request) -> Result<(), serde_json::Value> {
    let presented = req.params.get("session").and_then(|v| v.as_str());
    match (&state.session, presented) {
        (Some(s), Some(tok)) if s.token == tok => Ok(()),
        _ => Err(err(
            &req.id,
            "unauthorized",
            "admin session required",
            Some(json!({ "hint": "call session.login first" })),
        )),
    }
}
