
use serde_json::json;
use test_support::{error_code, open_workspace_and_login, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn fee_receipt_model_carries_words_and_snapshot() {
    let workspace = temp_dir("schoold-receipt-model");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "profile",
        "school.profileSet",
        json!({
            "session": token,
            "profile": { "name": "Green Valley Public School", "phone": "011-2345678" }
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "fs",
        "feeStructure.set",
        json!({
            "session": token,
            "className": "VI",
            "tuitionFee": 450.0,
            "examFee": 200.0,
            "sportsFee": 100.0
        }),
    );
    let admitted = request_ok(
        &mut stdin,
        &mut reader,
        "admit",
        "students.admit",
        json!({
            "session": token,
            "name": "Arjun Singh",
            "admissionNo": "ADM-91",
            "className": "VI",
            "section": "A"
        }),
    );
    let student_id = admitted.get("studentId").and_then(|v| v.as_str()).unwrap().to_string();

    let generated = request_ok(
        &mut stdin,
        &mut reader,
        "gen",
        "fees.generate",
        json!({ "session": token, "studentId": student_id, "month": 4, "year": 2026 }),
    );
    let fee_id = generated.get("feeId").and_then(|v| v.as_str()).unwrap().to_string();
    let paid = request_ok(
        &mut stdin,
        &mut reader,
        "pay",
        "payments.record",
        json!({ "session": token, "feeId": fee_id, "amount": 750.0, "method": "online" }),
    );
    let payment_id = paid.get("paymentId").and_then(|v| v.as_str()).unwrap().to_string();

    let model = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "reports.feeReceiptModel",
        json!({ "session": token, "paymentId": payment_id }),
    );
    assert_eq!(
        model
            .get("school")
            .and_then(|s| s.get("name"))
            .and_then(|v| v.as_str()),
        Some("Green Valley Public School")
    );
    assert_eq!(
        model
            .get("student")
            .and_then(|s| s.get("name"))
            .and_then(|v| v.as_str()),
        Some("Arjun Singh")
    );
    assert_eq!(
        model
            .get("fee")
            .and_then(|f| f.get("monthName"))
            .and_then(|v| v.as_str()),
        Some("April")
    );
    assert_eq!(model.get("amountPaid").and_then(|v| v.as_f64()), Some(750.0));
    assert_eq!(
        model.get("amountInWords").and_then(|v| v.as_str()),
        Some("Seven Hundred Fifty Rupees Only")
    );
    let file_name = model.get("fileName").and_then(|v| v.as_str()).unwrap();
    assert!(file_name.starts_with("Arjun-Singh-RCP-"), "{file_name}");
    assert!(file_name.ends_with(".pdf"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "m2",
        "reports.feeReceiptModel",
        json!({ "session": token, "paymentId": "nope" }),
    );
    assert_eq!(error_code(&missing), "not_found");
}

#[test]
fn transfer_certificate_snapshot_survives_student_edits() {
    let workspace = temp_dir("schoold-tc-model");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let admitted = request_ok(
        &mut stdin,
        &mut reader,
        "admit",
        "students.admit",
        json!({
            "session": token,
            "name": "Lakshmi Menon",
            "admissionNo": "ADM-95",
            "className": "X",
            "gender": "female",
            "dob": "2010-03-15",
            "fatherName": "Suresh Menon"
        }),
    );
    let student_id = admitted.get("studentId").and_then(|v| v.as_str()).unwrap().to_string();

    let issued = request_ok(
        &mut stdin,
        &mut reader,
        "tc1",
        "tc.generate",
        json!({
            "session": token,
            "studentId": student_id,
            "leavingReason": "Family relocation",
            "conduct": "Excellent"
        }),
    );
    let certificate_id = issued
        .get("certificateId")
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();
    let serial_no = issued.get("serialNo").and_then(|v| v.as_str()).unwrap().to_string();
    let issue_year = chrono::Datelike::year(&chrono::Utc::now());
    assert!(serial_no.starts_with(&format!("TC-{issue_year}-")), "{serial_no}");

    // Rename and then delete the student; the certificate keeps its snapshot.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "upd",
        "students.update",
        json!({ "session": token, "studentId": student_id, "name": "Renamed" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "del",
        "students.delete",
        json!({ "session": token, "studentId": student_id }),
    );

    let model = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "reports.transferCertificateModel",
        json!({ "session": token, "certificateId": certificate_id }),
    );
    let cert = model.get("certificate").unwrap();
    assert_eq!(
        cert.get("studentName").and_then(|v| v.as_str()),
        Some("Lakshmi Menon")
    );
    assert_eq!(cert.get("conduct").and_then(|v| v.as_str()), Some("Excellent"));
    assert_eq!(
        model
            .get("pronouns")
            .and_then(|p| p.get("child"))
            .and_then(|v| v.as_str()),
        Some("Daughter")
    );
    assert_eq!(
        model.get("dobInWords").and_then(|v| v.as_str()),
        Some("Fifteen March Two Thousand Ten")
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "l1",
        "tc.list",
        json!({ "session": token }),
    );
    assert_eq!(listed.get("certificates").unwrap().as_array().unwrap().len(), 1);
}

#[test]
fn conduct_defaults_to_good() {
    let workspace = temp_dir("schoold-tc-conduct");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_workspace_and_login(&mut stdin, &mut reader, &workspace);

    let admitted = request_ok(
        &mut stdin,
        &mut reader,
        "admit",
        "students.admit",
        json!({
            "session": token,
            "name": "Vikram Joshi",
            "admissionNo": "ADM-96",
            "className": "X"
        }),
    );
    let student_id = admitted.get("studentId").and_then(|v| v.as_str()).unwrap().to_string();
    let issued = request_ok(
        &mut stdin,
        &mut reader,
        "tc1",
        "tc.generate",
        json!({ "session": token, "studentId": student_id }),
    );
    let certificate_id = issued.get("certificateId").and_then(|v| v.as_str()).unwrap().to_string();

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "g1",
        "tc.get",
        json!({ "session": token, "certificateId": certificate_id }),
    );
    let cert = got.get("certificate").unwrap();
    assert_eq!(cert.get("conduct").and_then(|v| v.as_str()), Some("Good"));
    let model = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "reports.transferCertificateModel",
        json!({ "session": token, "certificateId": certificate_id }),
    );
    assert_eq!(
        model
            .get("pronouns")
            .and_then(|p| p.get("child"))
            .and_then(|v| v.as_str()),
        Some("Son")
    );
}
