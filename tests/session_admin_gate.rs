
use serde_json::json;
use test_support::{
    error_code, open_workspace_and_login, request, request_ok, spawn_sidecar, temp_dir,
    ADMIN_EMAIL, ADMIN_PASSWORD,
};

#[test]
fn only_the_seeded_admin_can_log_in() {
    let workspace = temp_dir("schoold-gate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "stranger@school.test", "password": "whatever" }),
    );
    assert_eq!(error_code(&resp), "unauthorized");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.login",
        json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
    );
    assert_eq!(error_code(&resp), "unauthorized");

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "session.login",
        json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
    );
    assert_eq!(login.get("email").and_then(|v| v.as_str()), Some(ADMIN_EMAIL));
    assert_eq!(login.get("role").and_then(|v| v.as_str()), Some("admin"));
    assert!(login.get("session").and_then(|v| v.as_str()).is_some());
}

#[test]
fn failed_login_forces_sign_out_of_live_session() {
    let workspace = temp_dir("schoold-gate-signout");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    // Session is live.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.list",
        json!({ "session": token }),
    );

    // Any unauthorized identity attempt clears it.
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "intruder@school.test", "password": "x" }),
    );
    assert_eq!(error_code(&resp), "unauthorized");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "session": token }),
    );
    assert_eq!(error_code(&resp), "unauthorized");

    let current = request_ok(&mut stdin, &mut reader, "4", "session.current", json!({}));
    assert!(current.get("email").unwrap().is_null());
}

#[test]
fn mutations_require_a_session_but_public_reads_do_not() {
    let workspace = temp_dir("schoold-gate-public");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Public site reads work without any login.
    let notices = request_ok(&mut stdin, &mut reader, "2", "notices.list", json!({}));
    assert_eq!(notices.get("items").unwrap().as_array().unwrap().len(), 0);
    let _ = request_ok(&mut stdin, &mut reader, "3", "staff.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "4", "feeStructure.get", json!({}));

    // Mutations do not.
    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "notices.create",
        json!({ "title": "t", "body": "b" }),
    );
    assert_eq!(error_code(&resp), "unauthorized");
    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "classes.create",
        json!({ "name": "VI" }),
    );
    assert_eq!(error_code(&resp), "unauthorized");
}

#[test]
fn logout_ends_the_session() {
    let workspace = temp_dir("schoold-gate-logout");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(&mut stdin, &mut reader, "1", "session.logout", json!({}));
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "session": token }),
    );
    assert_eq!(error_code(&resp), "unauthorized");
}
