//! Shared metadata for engine integration tests

use doclink_backend::{MockBackend, MockBackendBuilder};
use doclink_core::{
    DistributionStamp, DistributionStampField, DocumentTypePropertyRecord, DocumentTypeRecord, Property, Workflow,
    WorkflowActivity,
};
use uuid::Uuid;

pub const STAMP_ID: Uuid = Uuid::from_u128(0x0b5e_4c1a_0000_0000_0000_0000_0000_0001);

/// AP invoice setup: header properties, one line-level property and a
/// coding stamp
pub fn ap_backend() -> MockBackendBuilder {
    MockBackend::builder()
        .with_property(Property::new(1, "Invoice #", 0))
        .with_property(Property::new(2, "Amount Due", 4))
        .with_property(Property::new(3, "Voucher No", 0))
        .with_property(Property::new(4, "Line Amount", 4))
        .with_document_type(
            DocumentTypeRecord::new(10, "AP Invoice")
                .with_property(DocumentTypePropertyRecord::new(102, 10, 3, 3))
                .with_property(DocumentTypePropertyRecord::new(100, 10, 1, 1))
                .with_property(DocumentTypePropertyRecord::new(101, 10, 2, 2))
                .with_property(DocumentTypePropertyRecord::new(103, 10, 4, 4)),
        )
        .with_workflow(Workflow::new(1, "AP Export"))
        .with_activity(WorkflowActivity::new(11, 1, "Ready", 1))
        .with_activity(WorkflowActivity::new(12, 1, "Exporting", 2))
        .with_activity(WorkflowActivity::new(13, 1, "Exported", 3))
        .with_activity(WorkflowActivity::new(14, 1, "Export Failed", 4))
        .with_ai_profile("Invoice Export")
        .with_stamp(DistributionStamp::new(STAMP_ID, 7, "AP Coding"))
        .with_stamp_field(DistributionStampField::new(41, STAMP_ID, "GL Account", 0))
        .with_stamp_field(DistributionStampField::new(42, STAMP_ID, "Amount", 1))
}
