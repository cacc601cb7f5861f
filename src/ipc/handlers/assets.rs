use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_admin, required_str, workspace_path};
use crate::ipc::types::{AppState, Request};
use crate::store;
use base64::Engine;
use serde_json::json;

fn handle_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let workspace = match workspace_path(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let prefix = match required_str(req, "prefix") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let file_name = match required_str(req, "fileName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let data_b64 = match required_str(req, "dataBase64") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let data = match base64::engine::general_purpose::STANDARD.decode(data_b64.as_bytes()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("dataBase64 is not valid base64: {}", e),
                None,
            )
        }
    };

    match store::save(&workspace, &prefix, &file_name, &data) {
        Ok(saved) => {
            tracing::debug!(path = %saved.path, size = saved.size, "asset stored");
            ok(
                &req.id,
                json!({
                    "path": saved.path,
                    "url": saved.url,
                    "sha256": saved.sha256,
                    "size": saved.size
                }),
            )
        }
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let workspace = match workspace_path(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::delete(&workspace, &path) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assets.upload" => Some(handle_upload(state, req)),
        "assets.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
