//! Backend capability trait shared by the HTTP and SQL transports

use crate::error::BackendError;
use doclink_core::{
    link_distribution_stamps, DistributionStamp, DistributionStampField, DocumentType, Property, Workflow,
    WorkflowActivity,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Table holding workflows
pub const WORKFLOW_TABLE: &str = "Workflows";
/// Table holding workflow activities
pub const WORKFLOW_ACTIVITY_TABLE: &str = "WorkflowActivities";
/// Table holding distribution stamps
pub const DIST_STAMP_TABLE: &str = "DynamicUI";
/// Table holding distribution stamp fields
pub const DIST_STAMP_FIELD_TABLE: &str = "DynamicUIField";
/// Table holding auto-index profiles
pub const AI_PROFILE_TABLE: &str = "AIProfiles";
/// Table holding event automated tasks
pub const EVENT_TASK_TABLE: &str = "EventAutomatedTasks";

/// How generated artifacts reach the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to a script file for someone to run by hand
    File,

    /// Executed through the live connection
    Commit,
}

/// Column descriptor of a queried table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableColumn {
    pub name: String,
}

/// Rows returned by a table query, positionally aligned with `columns`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableData {
    pub columns: Vec<TableColumn>,

    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl TableData {
    pub fn new(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| TableColumn { name: c.to_string() }).collect(),
            rows,
        }
    }

    /// Deserialize every row into `T`, keyed by column name
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, BackendError> {
        self.rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, value)| (column.name.clone(), value.clone()))
                    .collect();
                Ok(serde_json::from_value(serde_json::Value::Object(object))?)
            })
            .collect()
    }

    /// Values of the first column rendered as strings
    pub fn first_column(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Tables and procedures the connected user may access
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibleItems {
    pub tables: Vec<String>,
    pub procedures: Vec<String>,
}

impl AccessibleItems {
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t == name)
    }

    pub fn has_procedure(&self, name: &str) -> bool {
        self.procedures.iter().any(|p| p == name)
    }
}

/// Remote-import schedule attached to a document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiSchedule {
    pub processing_interval: i32,
    pub processing_interval_type: i32,
}

/// Degrade a missing whitelist entry to an empty result
pub fn optional_table<T>(result: Result<Vec<T>, BackendError>, table: &str) -> Result<Vec<T>, BackendError> {
    match result {
        Err(BackendError::TableNotWhitelisted(_)) => {
            tracing::debug!(table, "table not whitelisted, returning no rows");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Capability set implemented by every DocLink transport
///
/// Retrieval and whitelist queries are supported everywhere. The
/// administrative operations default to [`BackendError::Unsupported`] and
/// are overridden by transports able to run them.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Short transport name, e.g. "api" or "sql"
    fn name(&self) -> &'static str;

    fn delivery(&self) -> Delivery;

    async fn get_properties(&self) -> Result<Vec<Property>, BackendError>;

    /// Document types with their properties resolved against `properties`
    async fn get_document_types_with_props(&self, properties: &[Property]) -> Result<Vec<DocumentType>, BackendError>;

    async fn get_workflows(&self) -> Result<Vec<Workflow>, BackendError>;

    async fn get_workflow_activities(&self) -> Result<Vec<WorkflowActivity>, BackendError>;

    async fn get_ai_profiles(&self) -> Result<Vec<String>, BackendError>;

    async fn get_event_task_names(&self) -> Result<Vec<String>, BackendError>;

    async fn get_dist_stamps(&self) -> Result<Vec<DistributionStamp>, BackendError>;

    async fn get_dist_stamp_fields(&self) -> Result<Vec<DistributionStampField>, BackendError>;

    /// Stamps with their fields attached; empty when either list is empty
    async fn get_dist_stamps_with_fields(&self) -> Result<Vec<DistributionStamp>, BackendError> {
        let stamps = self.get_dist_stamps().await?;
        let fields = self.get_dist_stamp_fields().await?;
        Ok(link_distribution_stamps(stamps, fields))
    }

    /// Number of procedures with this name; 0 when absent
    async fn check_sproc_exists(&self, sproc_name: &str) -> Result<u32, BackendError>;

    /// Whether `table` is on the accessible-items list
    ///
    /// `refresh` bypasses the cached listing.
    async fn table_whitelisted(&self, table: &str, refresh: bool) -> Result<bool, BackendError>;

    async fn query_table(&self, table: &str) -> Result<TableData, BackendError>;

    async fn run_query(&self, _query: &str) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "run_query"))
    }

    async fn drop_staging_tables(&self) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "drop_staging_tables"))
    }

    /// Definition text of a stored procedure
    async fn sproc_text(&self, _sproc_name: &str) -> Result<String, BackendError> {
        Err(BackendError::unsupported(self.name(), "sproc_text"))
    }

    async fn enable_ai_for_document_type(&self, _doc_type_id: i64) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "enable_ai_for_document_type"))
    }

    async fn enable_ri_for_document_type(&self, _doc_type_id: i64, _ri_method: i32) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "enable_ri_for_document_type"))
    }

    async fn ri_schedule(&self, _doc_type_id: i64) -> Result<Option<RiSchedule>, BackendError> {
        Err(BackendError::unsupported(self.name(), "ri_schedule"))
    }

    async fn create_ri_schedule(&self, _doc_type_id: i64, _schedule: RiSchedule) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "create_ri_schedule"))
    }

    async fn update_ri_schedule(&self, _doc_type_id: i64, _schedule: RiSchedule) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "update_ri_schedule"))
    }

    /// Create an auto-index profile, returning its id
    async fn create_auto_index(&self, _name: &str, _script: &str) -> Result<i64, BackendError> {
        Err(BackendError::unsupported(self.name(), "create_auto_index"))
    }

    async fn attach_auto_index_to_doc_type(
        &self,
        _doc_type_id: i64,
        _ai_profile_id: i64,
        _execution_context: i32,
    ) -> Result<i64, BackendError> {
        Err(BackendError::unsupported(self.name(), "attach_auto_index_to_doc_type"))
    }

    async fn add_auto_index_return_property(
        &self,
        _ai_profile_id: i64,
        _property_id: i64,
        _column_name: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "add_auto_index_return_property"))
    }

    /// Create an event fired by a workflow activity, returning the task id
    async fn create_triggered_event(
        &self,
        _task_name: &str,
        _activity_id: i64,
        _start_active: bool,
    ) -> Result<i64, BackendError> {
        Err(BackendError::unsupported(self.name(), "create_triggered_event"))
    }

    /// Create a schedule-driven event, returning the task id
    async fn create_scheduled_event(&self, _task_name: &str, _start_active: bool) -> Result<i64, BackendError> {
        Err(BackendError::unsupported(self.name(), "create_scheduled_event"))
    }

    async fn add_event_database_action(
        &self,
        _event_id: i64,
        _action_name: &str,
        _sproc_name: &str,
    ) -> Result<i64, BackendError> {
        Err(BackendError::unsupported(self.name(), "add_event_database_action"))
    }

    async fn add_event_db_action_param(
        &self,
        _action_id: i64,
        _param_name: &str,
        _param_value: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::unsupported(self.name(), "add_event_db_action_param"))
    }

    /// Schedule an existing event task, returning its configuration id
    async fn add_schedule_for_event_by_task_id(
        &self,
        _task_id: i64,
        _interval_period: i32,
        _interval_type: i32,
    ) -> Result<String, BackendError> {
        Err(BackendError::unsupported(self.name(), "add_schedule_for_event_by_task_id"))
    }
}
