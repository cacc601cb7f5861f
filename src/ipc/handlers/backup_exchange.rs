use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_admin, required_str, workspace_path};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let workspace = match workspace_path(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "assetCount": summary.asset_count,
                "outPath": out_path.to_string_lossy()
            }),
        ),
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:?}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let workspace = match workspace_path(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    // Close the live connection so the database file can be swapped.
    state.db = None;
    let restored = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = db::open_db(&workspace);
    match (restored, reopened) {
        (Ok(summary), Ok(conn)) => {
            state.db = Some(conn);
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "assetCount": summary.asset_count
                }),
            )
        }
        (Err(e), _) => {
            // Import failed; reopen the previous database if possible.
            if let Ok(conn) = db::open_db(&workspace) {
                state.db = Some(conn);
            }
            err(&req.id, "backup_import_failed", format!("{e:?}"), None)
        }
        (_, Err(e)) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_export(state, req)),
        "backup.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
