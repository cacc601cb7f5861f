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

const GALLERY: ContentSpec = ContentSpec {
    prefix: "gallery",
    table: "gallery_photos",
    fields: &[
        text("caption", "caption", false),
        text("album", "album", false),
        text("imagePath", "image_path", true),
        text("imageUrl", "image_url", true),
    ],
    media_path_column: Some("image_path"),
    order_by: "created_at DESC",
};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gallery.list" => Some(content::handle_list(state, req, &GALLERY)),
        "gallery.create" => Some(content::handle_create(state, req, &GALLERY)),
        "gallery.update" => Some(content::handle_update(state, req, &GALLERY)),
        "gallery.delete" => Some(content::handle_delete(state, req, &GALLERY)),
        _ => None,
    }
}
