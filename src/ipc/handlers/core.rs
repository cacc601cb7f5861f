use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::now_iso;
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn seed_admin(conn: &rusqlite::Connection, state: &AppState) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM admin_users", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(false);
    }
    let (Some(email), Some(password)) = (&state.admin_seed.email, &state.admin_seed.password)
    else {
        return Ok(false);
    };
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    conn.execute(
        "INSERT INTO admin_users(id, email, password_hash, role, created_at)
         VALUES(?, ?, ?, 'admin', ?)",
        (Uuid::new_v4().to_string(), email, hash, now_iso()),
    )?;
    Ok(true)
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            if let Err(e) = store::ensure_layout(&path) {
                return err(&req.id, "db_open_failed", format!("{e:?}"), None);
            }
            let seeded = match seed_admin(&conn, state) {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
            };
            if seeded {
                tracing::info!("seeded initial admin user");
            }

            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // A new workspace invalidates any previous login.
            state.session = None;
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "adminSeeded": seeded
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
