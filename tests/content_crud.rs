
use serde_json::json;
use test_support::{error_code, open_workspace_and_login, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn notices_crud() {
    let workspace = temp_dir("schoold-notices");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let missing_body = request(
        &mut stdin,
        &mut reader,
        "c0",
        "notices.create",
        json!({ "session": token, "title": "Half day" }),
    );
    assert_eq!(error_code(&missing_body), "bad_params");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "notices.create",
        json!({
            "session": token,
            "title": "Half day on Friday",
            "body": "School closes at noon for staff training.",
            "publishedOn": "2026-09-04"
        }),
    );
    let notice_id = created.get("id").and_then(|v| v.as_str()).unwrap().to_string();

    // The public site reads notices without a session.
    let listed = request_ok(&mut stdin, &mut reader, "l1", "notices.list", json!({}));
    let items = listed.get("items").unwrap().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].get("title").and_then(|v| v.as_str()),
        Some("Half day on Friday")
    );
    assert!(items[0].get("attachmentPath").unwrap().is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "u1",
        "notices.update",
        json!({ "session": token, "id": notice_id, "title": "Half day on Monday" }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "l2", "notices.list", json!({}));
    let items = listed.get("items").unwrap().as_array().unwrap();
    assert_eq!(
        items[0].get("title").and_then(|v| v.as_str()),
        Some("Half day on Monday")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "d1",
        "notices.delete",
        json!({ "session": token, "id": notice_id }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "l3", "notices.list", json!({}));
    assert_eq!(listed.get("items").unwrap().as_array().unwrap().len(), 0);

    let gone = request(
        &mut stdin,
        &mut reader,
        "d2",
        "notices.delete",
        json!({ "session": token, "id": notice_id }),
    );
    assert_eq!(error_code(&gone), "not_found");
}

#[test]
fn banners_sort_by_explicit_order() {
    let workspace = temp_dir("schoold-banners");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    for (i, (title, order)) in [("Second", 2), ("First", 1), ("Third", 3)].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{i}"),
            "banners.create",
            json!({
                "session": token,
                "title": title,
                "imagePath": format!("assets/banners/{i}.png"),
                "imageUrl": format!("asset://assets/banners/{i}.png"),
                "sortOrder": order
            }),
        );
    }

    let listed = request_ok(&mut stdin, &mut reader, "l1", "banners.list", json!({}));
    let titles: Vec<&str> = listed
        .get("items")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i.get("title").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
}

#[test]
fn events_alumni_and_staff_collections() {
    let workspace = temp_dir("schoold-collections");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e1",
        "events.create",
        json!({
            "session": token,
            "title": "Annual Sports Day",
            "description": "Track and field events for all classes.",
            "eventDate": "2026-11-20"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "a1",
        "alumni.create",
        json!({
            "session": token,
            "name": "Priya Sharma",
            "batchYear": 2015,
            "occupation": "Software engineer"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s1",
        "staff.create",
        json!({
            "session": token,
            "name": "R. K. Gupta",
            "designation": "Principal",
            "qualification": "M.Ed."
        }),
    );

    let events = request_ok(&mut stdin, &mut reader, "e2", "events.list", json!({}));
    assert_eq!(events.get("items").unwrap().as_array().unwrap().len(), 1);

    let alumni = request_ok(&mut stdin, &mut reader, "a2", "alumni.list", json!({}));
    let items = alumni.get("items").unwrap().as_array().unwrap();
    assert_eq!(items[0].get("batchYear").and_then(|v| v.as_i64()), Some(2015));

    let staff = request_ok(&mut stdin, &mut reader, "s2", "staff.list", json!({}));
    let items = staff.get("items").unwrap().as_array().unwrap();
    assert_eq!(
        items[0].get("designation").and_then(|v| v.as_str()),
        Some("Principal")
    );

    // A name-less alumni record is rejected.
    let bad = request(
        &mut stdin,
        &mut reader,
        "a3",
        "alumni.create",
        json!({ "session": token, "occupation": "Doctor" }),
    );
    assert_eq!(error_code(&bad), "bad_params");
}
