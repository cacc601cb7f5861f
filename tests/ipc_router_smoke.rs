
use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn health_reports_version_and_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").unwrap().is_null());

    let workspace = temp_dir("schoold-smoke");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
}

#[test]
fn unknown_method_is_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(&mut stdin, &mut reader, "1", "nope.nothing", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&resp), "not_implemented");
}

#[test]
fn data_methods_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(&mut stdin, &mut reader, "1", "notices.list", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&resp), "no_workspace");
}
