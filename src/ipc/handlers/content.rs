use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_iso, require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::{params_from_iter, types::Value, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn text(param: &'static str, column: &'static str, required: bool) -> Field {
    Field {
        param,
        column,
        kind: FieldKind::Text,
        required,
    }
}

const fn int(param: &'static str, column: &'static str) -> Field {
    Field {
        param,
        column,
        kind: FieldKind::Int,
        required: false,
    }
}

/// One independent content collection of the public site: notices, events,
/// banners, alumni. They share the same CRUD shape, so a table description is
/// enough to drive all four.
#[derive(Debug, Clone, Copy)]
pub struct ContentSpec {
    pub prefix: &'static str,
    pub table: &'static str,
    pub fields: &'static [Field],
    /// Asset-store path column, cleaned up when a record is deleted.
    pub media_path_column: Option<&'static str>,
    pub order_by: &'static str,
}

const NOTICES: ContentSpec = ContentSpec {
    prefix: "notices",
    table: "notices",
    fields: &[
        text("title", "title", true),
        text("body", "body", true),
        text("attachmentPath", "attachment_path", false),
        text("attachmentUrl", "attachment_url", false),
        text("publishedOn", "published_on", false),
    ],
    media_path_column: Some("attachment_path"),
    order_by: "created_at DESC",
};

const EVENTS: ContentSpec = ContentSpec {
    prefix: "events",
    table: "events",
    fields: &[
        text("title", "title", true),
        text("description", "description", false),
        text("eventDate", "event_date", false),
        text("imagePath", "image_path", false),
        text("imageUrl", "image_url", false),
    ],
    media_path_column: Some("image_path"),
    order_by: "event_date DESC, created_at DESC",
};

const BANNERS: ContentSpec = ContentSpec {
    prefix: "banners",
    table: "banners",
    fields: &[
        text("title", "title", false),
        text("imagePath", "image_path", true),
        text("imageUrl", "image_url", true),
        int("sortOrder", "sort_order"),
    ],
    media_path_column: Some("image_path"),
    order_by: "sort_order, created_at",
};

const ALUMNI: ContentSpec = ContentSpec {
    prefix: "alumni",
    table: "alumni",
    fields: &[
        text("name", "name", true),
        int("batchYear", "batch_year"),
        text("occupation", "occupation", false),
        text("message", "message", false),
        text("photoPath", "photo_path", false),
        text("photoUrl", "photo_url", false),
    ],
    media_path_column: Some("photo_path"),
    order_by: "batch_year DESC, name",
};

const SPECS: [&ContentSpec; 4] = [&NOTICES, &EVENTS, &BANNERS, &ALUMNI];

fn field_value(req: &Request, field: &Field) -> Option<Value> {
    match field.kind {
        FieldKind::Text => req
            .params
            .get(field.param)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Value::Text),
        FieldKind::Int => req
            .params
            .get(field.param)
            .and_then(|v| v.as_i64())
            .map(Value::Integer),
    }
}

pub fn handle_list(
    state: &mut AppState,
    req: &Request,
    spec: &ContentSpec,
) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let columns: Vec<&str> = spec.fields.iter().map(|f| f.column).collect();
    let sql = format!(
        "SELECT id, {}, created_at FROM {} ORDER BY {}",
        columns.join(", "),
        spec.table,
        spec.order_by
    );
    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |r| {
            let mut obj = serde_json::Map::new();
            obj.insert("id".to_string(), json!(r.get::<_, String>(0)?));
            for (i, field) in spec.fields.iter().enumerate() {
                let v = match field.kind {
                    FieldKind::Text => json!(r.get::<_, Option<String>>(i + 1)?),
                    FieldKind::Int => json!(r.get::<_, Option<i64>>(i + 1)?),
                };
                obj.insert(field.param.to_string(), v);
            }
            obj.insert(
                "createdAt".to_string(),
                json!(r.get::<_, String>(spec.fields.len() + 1)?),
            );
            Ok(serde_json::Value::Object(obj))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn handle_create(
    state: &mut AppState,
    req: &Request,
    spec: &ContentSpec,
) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let record_id = Uuid::new_v4().to_string();
    let mut columns: Vec<&str> = vec!["id"];
    let mut binds: Vec<Value> = vec![Value::Text(record_id.clone())];
    for field in spec.fields {
        match field_value(req, field) {
            Some(v) => {
                columns.push(field.column);
                binds.push(v);
            }
            None if field.required => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("missing {}", field.param),
                    None,
                );
            }
            None => {}
        }
    }
    columns.push("created_at");
    binds.push(Value::Text(now_iso()));

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        spec.table,
        columns.join(", "),
        placeholders
    );
    if let Err(e) = conn.execute(&sql, params_from_iter(binds)) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": spec.table })),
        );
    }

    ok(&req.id, json!({ "id": record_id }))
}

pub fn handle_update(
    state: &mut AppState,
    req: &Request,
    spec: &ContentSpec,
) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let record_id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists_sql = format!("SELECT 1 FROM {} WHERE id = ?", spec.table);
    let exists: Option<i64> = match conn
        .query_row(&exists_sql, [&record_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "record not found", None);
    }

    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    for field in spec.fields {
        if let Some(v) = field_value(req, field) {
            sets.push(format!("{} = ?", field.column));
            binds.push(v);
        }
    }
    if sets.is_empty() {
        return err(&req.id, "bad_params", "no fields to update", None);
    }
    binds.push(Value::Text(record_id.clone()));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?",
        spec.table,
        sets.join(", ")
    );
    if let Err(e) = conn.execute(&sql, params_from_iter(binds)) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": spec.table })),
        );
    }

    ok(&req.id, json!({ "id": record_id }))
}

pub fn handle_delete(
    state: &mut AppState,
    req: &Request,
    spec: &ContentSpec,
) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let record_id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let workspace = state.workspace.clone();
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let media_path: Option<String> = match spec.media_path_column {
        Some(col) => {
            let sql = format!("SELECT {} FROM {} WHERE id = ?", col, spec.table);
            match conn
                .query_row(&sql, [&record_id], |r| r.get::<_, Option<String>>(0))
                .optional()
            {
                Ok(Some(v)) => v,
                Ok(None) => return err(&req.id, "not_found", "record not found", None),
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            }
        }
        None => None,
    };

    let sql = format!("DELETE FROM {} WHERE id = ?", spec.table);
    let affected = match conn.execute(&sql, [&record_id]) {
        Ok(n) => n,
        Err(e) => {
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": spec.table })),
            )
        }
    };
    if affected == 0 {
        return err(&req.id, "not_found", "record not found", None);
    }

    // The record's media file goes too; a missing file is logged, not fatal.
    if let (Some(ws), Some(path)) = (workspace, media_path) {
        store::delete_quiet(&ws, &path);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (prefix, op) = req.method.split_once('.')?;
    let spec = SPECS.iter().find(|s| s.prefix == prefix)?;
    match op {
        "list" => Some(handle_list(state, req, spec)),
        "create" => Some(handle_create(state, req, spec)),
        "update" => Some(handle_update(state, req, spec)),
        "delete" => Some(handle_delete(state, req, spec)),
        _ => None,
    }
}
