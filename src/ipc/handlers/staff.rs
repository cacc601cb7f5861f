use crate::ipc::types::{AppState, Request};

use super::content::{self, ContentSpec, Field, FieldKind};

const fn text(param: &'static str, column: &'static str, required: bool) -> Field {
    Field {
        param,
        column,
        kind: FieldKind::Text,
        required,
    }
}

/// The staff directory is the same CRUD shape as the content collections;
/// only the field list differs.
const STAFF: ContentSpec = ContentSpec {
    prefix: "staff",
    table: "staff",
    fields: &[
        text("name", "name", true),
        text("designation", "designation", false),
        text("qualification", "qualification", false),
        text("subject", "subject", false),
        text("phone", "phone", false),
        text("email", "email", false),
        text("photoPath", "photo_path", false),
        text("photoUrl", "photo_url", false),
        text("joinedOn", "joined_on", false),
    ],
    media_path_column: Some("photo_path"),
    order_by: "name",
};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.list" => Some(content::handle_list(state, req, &STAFF)),
        "staff.create" => Some(content::handle_create(state, req, &STAFF)),
        "staff.update" => Some(content::handle_update(state, req, &STAFF)),
        "staff.delete" => Some(content::handle_delete(state, req, &STAFF)),
        _ => None,
    }
}
