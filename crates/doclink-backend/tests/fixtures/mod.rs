//! Canned DocLink API payloads for transport integration tests
//!
//! The payloads mirror what the HTTP API returns for a small AP setup: two
//! invoice properties, one document type and one distribution stamp.

use doclink_backend::{HttpMethod, MockTransport, TableData};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://doclink.test/";
pub const STAMP_ID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

pub fn properties() -> Value {
    json!([
        { "PropertyId": 1, "UserPrompt": "Invoice #", "DataType": 0, "HasLookup": 0, "FieldName": null },
        { "PropertyId": 2, "UserPrompt": "Amount Due", "DataType": 4, "HasLookup": false },
        { "PropertyId": 3, "UserPrompt": "Vendor ID", "DataType": 0 }
    ])
}

/// One document type whose property rows arrive out of sequence order
pub fn document_types() -> Value {
    json!([
        {
            "DocumentTypeId": 10,
            "ParentID": null,
            "Name": "AP Invoice",
            "AIEnabled": 1,
            "RIEnabled": 0,
            "DocumentTypeProperties": [
                { "DocumentTypePropertyId": 101, "ParentId": 10, "PropertyId": 2, "SequenceNumber": 2 },
                { "DocumentTypePropertyId": 100, "ParentId": 10, "PropertyId": 1, "SequenceNumber": 1 }
            ]
        }
    ])
}

pub fn accessible_items() -> Value {
    json!({
        "Tables": [{ "Name": "DynamicUI" }, { "Name": "DynamicUIField" }, { "Name": "AIProfiles" }],
        "Procedures": [{ "Name": "spExportInvoices" }]
    })
}

pub fn stamps() -> TableData {
    TableData::new(
        &["DynamicUiId", "DynamicUISecurityId", "Name", "CanAttach"],
        vec![vec![json!(STAMP_ID), json!(5), json!("AP Coding"), json!(1)]],
    )
}

pub fn stamp_fields() -> TableData {
    TableData::new(
        &["DynamicUIFieldId", "DynamicUIId", "Name", "Caption", "DataType"],
        vec![
            vec![json!(41), json!(STAMP_ID), json!("GLAccount"), json!("GL Account"), json!(0)],
            vec![json!(42), json!(STAMP_ID), json!("Amount"), json!("Line Amount"), json!(1)],
        ],
    )
}

pub fn ai_profiles() -> TableData {
    TableData::new(&["ProfileName", "AIProfileID"], vec![vec![json!("Invoice Export"), json!(3)]])
}

/// Transport answering login and every fixture endpoint
pub fn transport() -> MockTransport {
    MockTransport::new()
        .with_response(HttpMethod::Post, "LoginCloud", json!("auth-42"))
        .with_response(HttpMethod::Get, "Properties", properties())
        .with_response(HttpMethod::Get, "DocumentTypes", document_types())
        .with_response(HttpMethod::Get, "AccessibleItems", accessible_items())
        .with_table("DynamicUI", &stamps())
        .with_table("DynamicUIField", &stamp_fields())
        .with_table("AIProfiles", &ai_profiles())
}
