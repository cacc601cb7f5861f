
use base64::Engine;
use serde_json::json;
use test_support::{error_code, open_workspace_and_login, request, request_ok, spawn_sidecar, temp_dir};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x01];

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[test]
fn upload_attach_and_delete_gallery_photo() {
    let workspace = temp_dir("schoold-gallery");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let uploaded = request_ok(
        &mut stdin,
        &mut reader,
        "u1",
        "assets.upload",
        json!({
            "session": token,
            "prefix": "gallery",
            "fileName": "sports-day.png",
            "dataBase64": b64(PNG_BYTES)
        }),
    );
    let path = uploaded.get("path").and_then(|v| v.as_str()).unwrap().to_string();
    let url = uploaded.get("url").and_then(|v| v.as_str()).unwrap().to_string();
    assert!(path.starts_with("assets/gallery/"));
    assert!(path.ends_with(".png"));
    assert_eq!(url, format!("asset://{path}"));
    assert_eq!(
        uploaded.get("size").and_then(|v| v.as_u64()),
        Some(PNG_BYTES.len() as u64)
    );
    assert!(workspace.join(&path).is_file());

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "g1",
        "gallery.create",
        json!({
            "session": token,
            "caption": "Relay race",
            "album": "Sports Day 2026",
            "imagePath": path,
            "imageUrl": url
        }),
    );
    let photo_id = created.get("id").and_then(|v| v.as_str()).unwrap().to_string();

    let listed = request_ok(&mut stdin, &mut reader, "g2", "gallery.list", json!({}));
    let items = listed.get("items").unwrap().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].get("album").and_then(|v| v.as_str()),
        Some("Sports Day 2026")
    );

    // Deleting the record removes the backing file too.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "g3",
        "gallery.delete",
        json!({ "session": token, "id": photo_id }),
    );
    assert!(!workspace.join(&path).exists());
}

#[test]
fn upload_rejects_bad_inputs() {
    let workspace = temp_dir("schoold-assets-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let bad_prefix = request(
        &mut stdin,
        &mut reader,
        "b1",
        "assets.upload",
        json!({
            "session": token,
            "prefix": "backups",
            "fileName": "a.png",
            "dataBase64": b64(b"x")
        }),
    );
    assert_eq!(error_code(&bad_prefix), "bad_params");

    let bad_ext = request(
        &mut stdin,
        &mut reader,
        "b2",
        "assets.upload",
        json!({
            "session": token,
            "prefix": "gallery",
            "fileName": "a.exe",
            "dataBase64": b64(b"x")
        }),
    );
    assert_eq!(error_code(&bad_ext), "asset_invalid_type");

    let bad_b64 = request(
        &mut stdin,
        &mut reader,
        "b3",
        "assets.upload",
        json!({
            "session": token,
            "prefix": "gallery",
            "fileName": "a.png",
            "dataBase64": "not base64!!!"
        }),
    );
    assert_eq!(error_code(&bad_b64), "bad_params");

    let traversal = request(
        &mut stdin,
        &mut reader,
        "b4",
        "assets.delete",
        json!({ "session": token, "path": "assets/../school.sqlite3" }),
    );
    assert_eq!(error_code(&traversal), "bad_params");
}
