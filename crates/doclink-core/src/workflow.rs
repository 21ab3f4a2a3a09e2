//! Workflows and workflow activities

use crate::serde_util::null_default;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Workflow {
    #[serde(rename = "WorkflowID")]
    pub id: i64,

    pub title: String,

    #[serde(default, deserialize_with = "null_default")]
    pub description: String,

    #[serde(rename = "FolderID", default, deserialize_with = "null_default")]
    pub folder_id: i64,

    #[serde(default, deserialize_with = "null_default")]
    pub workflow_key: String,
}

impl Workflow {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            folder_id: 0,
            workflow_key: String::new(),
        }
    }
}

/// A step of a workflow
///
/// Refers to its workflow by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkflowActivity {
    #[serde(rename = "WorkflowActivityID")]
    pub id: i64,

    #[serde(rename = "WorkflowID")]
    pub workflow_id: i64,

    pub title: String,

    #[serde(default, deserialize_with = "null_default")]
    pub description: String,

    #[serde(rename = "Seq", default, deserialize_with = "null_default")]
    pub sequence: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub system_activity: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub workflow_activity_key: String,
}

impl WorkflowActivity {
    pub fn new(id: i64, workflow_id: i64, title: impl Into<String>, sequence: i32) -> Self {
        Self {
            id,
            workflow_id,
            title: title.into(),
            description: String::new(),
            sequence,
            system_activity: 0,
            workflow_activity_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_rows() {
        let workflow: Workflow = serde_json::from_value(serde_json::json!({
            "WorkflowID": 3,
            "Title": "AP Approval",
            "Description": null,
            "FolderID": 2,
            "SendPackets": 0
        }))
        .unwrap();
        assert_eq!(workflow, Workflow { folder_id: 2, ..Workflow::new(3, "AP Approval") });

        let activity: WorkflowActivity = serde_json::from_value(serde_json::json!({
            "WorkflowActivityID": 30,
            "WorkflowID": 3,
            "Title": "Staging",
            "Seq": 1
        }))
        .unwrap();
        assert_eq!(activity, WorkflowActivity::new(30, 3, "Staging", 1));
    }
}
