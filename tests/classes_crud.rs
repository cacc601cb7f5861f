
use serde_json::json;
use test_support::{error_code, open_workspace_and_login, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn class_create_list_update_delete() {
    let workspace = temp_dir("schoold-classes");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({
            "session": token,
            "name": "VI",
            "sections": ["A", "B"],
            "subjects": ["English", "Mathematics", "Science"],
            "schedule": "Mon-Sat 8:00-13:30",
            "sectionCapacity": 40
        }),
    );
    let class_id = created
        .get("classId")
        .and_then(|v| v.as_str())
        .expect("classId")
        .to_string();

    let dup = request(
        &mut stdin,
        &mut reader,
        "2",
        "classes.create",
        json!({ "session": token, "name": "VI" }),
    );
    assert_eq!(error_code(&dup), "duplicate_class");

    let listed = request_ok(&mut stdin, &mut reader, "3", "classes.list", json!({}));
    let classes = listed.get("classes").unwrap().as_array().unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].get("name").and_then(|v| v.as_str()), Some("VI"));
    assert_eq!(
        classes[0].get("sections").unwrap().as_array().unwrap().len(),
        2
    );
    assert_eq!(
        classes[0].get("studentCount").and_then(|v| v.as_i64()),
        Some(0)
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "classes.update",
        json!({
            "session": token,
            "classId": class_id,
            "sections": ["A", "B", "C"],
            "sectionCapacity": 35
        }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "classes.list", json!({}));
    let classes = listed.get("classes").unwrap().as_array().unwrap();
    assert_eq!(
        classes[0].get("sections").unwrap().as_array().unwrap().len(),
        3
    );
    assert_eq!(
        classes[0].get("sectionCapacity").and_then(|v| v.as_i64()),
        Some(35)
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "classes.delete",
        json!({ "session": token, "classId": class_id }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "7", "classes.list", json!({}));
    assert_eq!(listed.get("classes").unwrap().as_array().unwrap().len(), 0);
}

#[test]
fn class_delete_drops_fee_structure_row() {
    let workspace = temp_dir("schoold-classes-fees");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({ "session": token, "name": "VII" }),
    );
    let class_id = created.get("classId").and_then(|v| v.as_str()).unwrap().to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "feeStructure.set",
        json!({
            "session": token,
            "className": "VII",
            "tuitionFee": 500.0,
            "examFee": 250.0,
            "sportsFee": 150.0
        }),
    );
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "feeStructure.get",
        json!({ "className": "VII" }),
    );
    assert_eq!(got.get("baseFee").and_then(|v| v.as_f64()), Some(900.0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "classes.delete",
        json!({ "session": token, "classId": class_id }),
    );

    // The fee table row went with the class; lookup falls back.
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "feeStructure.get",
        json!({ "className": "VII" }),
    );
    assert_eq!(got.get("fallback").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(got.get("baseFee").and_then(|v| v.as_f64()), Some(1000.0));
}
