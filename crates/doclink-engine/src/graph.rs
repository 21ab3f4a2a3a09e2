//! In-memory metadata graph populated from a backend
//!
//! The graph owns every entity list, indexes workflow activities by their
//! workflow, tracks the current selection and accumulates the columns chosen
//! for a staging export. Lists are replaced wholesale by their own successful
//! fetch and never merged.

use crate::error::GraphError;
use doclink_backend::{Backend, BackendError};
use doclink_core::{
    ColumnClass, CreationType, DistributionStamp, DistributionStampField, DocumentType, EntityKind, LookupKey,
    ModelError, Property, SprocAction, SprocInfo, Workflow, WorkflowActivity,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Workflow and the four activities an export moves documents through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowChain {
    pub workflow_id: i64,
    pub staging_activity_id: i64,
    pub staged_activity_id: i64,
    pub success_activity_id: i64,
    pub failed_activity_id: i64,
}

/// Titles used to select a [`WorkflowChain`]
///
/// Activity titles are resolved inside the named workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowChainNames<'a> {
    pub workflow: &'a str,
    pub staging: &'a str,
    pub staged: &'a str,
    pub success: &'a str,
    pub failed: &'a str,
}

/// Which activities an activity lookup searches
#[derive(Debug, Clone, Copy)]
pub enum ActivityScope<'a> {
    All,
    WorkflowId(i64),
    WorkflowName(&'a str),
}

/// Currently selected objects, held by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub document_type_id: Option<i64>,
    pub stamp_id: Option<Uuid>,
    pub workflow_chain: Option<WorkflowChain>,
}

#[derive(Debug, Clone, Default)]
pub struct MetadataGraph {
    pub properties: Vec<Property>,
    pub document_types: Vec<DocumentType>,
    pub workflows: Vec<Workflow>,

    /// Activities keyed by parent workflow id, in fetch order
    pub activities: BTreeMap<i64, Vec<WorkflowActivity>>,

    pub ai_profiles: Vec<String>,
    pub event_tasks: Vec<String>,
    pub stamp_fields: Vec<DistributionStampField>,
    pub stamps: Vec<DistributionStamp>,

    selection: Selection,
    sprocs: BTreeMap<String, SprocInfo>,
    staging_columns: BTreeMap<ColumnClass, Vec<String>>,
}

/// Treat an unsupported optional fetch as an empty listing
fn optional_listing(result: Result<Vec<String>, BackendError>, what: &str) -> Result<Vec<String>, BackendError> {
    match result {
        Ok(names) => Ok(names),
        Err(e) if e.is_unsupported() => {
            tracing::debug!(what, error = %e, "listing unavailable, using empty list");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every entity list in dependency order
    ///
    /// Stops at the first unrecoverable error. Lists fetched before the
    /// failure keep their new contents; the failing list and all later ones
    /// keep their previous contents.
    pub async fn populate(&mut self, backend: &dyn Backend) -> Result<(), GraphError> {
        tracing::info!(backend = backend.name(), "populating metadata");

        tracing::info!("fetching properties");
        self.properties = backend.get_properties().await?;

        tracing::info!("fetching document types");
        self.document_types = backend.get_document_types_with_props(&self.properties).await?;

        tracing::info!("fetching workflows");
        self.workflows = backend.get_workflows().await?;

        tracing::info!("fetching workflow activities");
        let mut activities: BTreeMap<i64, Vec<WorkflowActivity>> = BTreeMap::new();
        for activity in backend.get_workflow_activities().await? {
            activities.entry(activity.workflow_id).or_default().push(activity);
        }
        self.activities = activities;

        tracing::info!("fetching AI profile names");
        self.ai_profiles = optional_listing(backend.get_ai_profiles().await, "ai_profiles")?;

        tracing::info!("fetching event task names");
        self.event_tasks = optional_listing(backend.get_event_task_names().await, "event_tasks")?;

        tracing::info!("fetching distribution stamp fields");
        self.stamp_fields = backend.get_dist_stamp_fields().await?;

        tracing::info!("fetching distribution stamps");
        let stamps = backend.get_dist_stamps().await?;
        self.stamps = doclink_core::link_distribution_stamps(stamps, self.stamp_fields.clone());

        tracing::info!(
            properties = self.properties.len(),
            document_types = self.document_types.len(),
            workflows = self.workflows.len(),
            stamps = self.stamps.len(),
            "metadata populated"
        );
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn property_by_id(&self, property_id: i64) -> Result<&Property, ModelError> {
        self.properties
            .iter()
            .find(|p| p.property_id == property_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::Property, LookupKey::Id, property_id))
    }

    /// Property whose raw user prompt equals `prompt`
    pub fn property_by_prompt(&self, prompt: &str) -> Result<&Property, ModelError> {
        let prompt = prompt.trim();
        self.properties
            .iter()
            .find(|p| p.user_prompt == prompt)
            .ok_or_else(|| ModelError::not_found(EntityKind::Property, LookupKey::Prompt, prompt))
    }

    /// Property whose formatted prompt (its column identifier) equals `name`
    pub fn property_by_formatted_prompt(&self, name: &str) -> Result<&Property, ModelError> {
        let name = name.trim();
        self.properties
            .iter()
            .find(|p| p.formatted_prompt() == name)
            .ok_or_else(|| ModelError::not_found(EntityKind::Property, LookupKey::FormattedPrompt, name))
    }

    pub fn document_type_by_id(&self, document_type_id: i64) -> Result<&DocumentType, ModelError> {
        self.document_types
            .iter()
            .find(|d| d.id == document_type_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::DocumentType, LookupKey::Id, document_type_id))
    }

    pub fn document_type_by_name(&self, name: &str) -> Result<&DocumentType, ModelError> {
        self.document_types
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ModelError::not_found(EntityKind::DocumentType, LookupKey::Name, name))
    }

    pub fn stamp_by_security_id(&self, security_id: i64) -> Result<&DistributionStamp, ModelError> {
        self.stamps
            .iter()
            .find(|s| s.security_id == security_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::DistributionStamp, LookupKey::Id, security_id))
    }

    pub fn stamp_by_uuid(&self, stamp_id: Uuid) -> Result<&DistributionStamp, ModelError> {
        self.stamps
            .iter()
            .find(|s| s.id == stamp_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::DistributionStamp, LookupKey::Uuid, stamp_id))
    }

    pub fn stamp_by_name(&self, name: &str) -> Result<&DistributionStamp, ModelError> {
        self.stamps
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ModelError::not_found(EntityKind::DistributionStamp, LookupKey::Name, name))
    }

    pub fn stamp_field_by_name(&self, name: &str) -> Result<&DistributionStampField, ModelError> {
        self.stamp_fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ModelError::not_found(EntityKind::DistributionStampField, LookupKey::Name, name))
    }

    pub fn stamp_field_by_caption(&self, caption: &str) -> Result<&DistributionStampField, ModelError> {
        self.stamp_fields
            .iter()
            .find(|f| f.caption == caption)
            .ok_or_else(|| ModelError::not_found(EntityKind::DistributionStampField, LookupKey::Caption, caption))
    }

    pub fn workflow_by_id(&self, workflow_id: i64) -> Result<&Workflow, ModelError> {
        self.workflows
            .iter()
            .find(|w| w.id == workflow_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::Workflow, LookupKey::Id, workflow_id))
    }

    pub fn workflow_by_name(&self, title: &str) -> Result<&Workflow, ModelError> {
        self.workflows
            .iter()
            .find(|w| w.title == title)
            .ok_or_else(|| ModelError::not_found(EntityKind::Workflow, LookupKey::Name, title))
    }

    /// Activities of one workflow; empty for a workflow without any
    pub fn activities_by_workflow_id(&self, workflow_id: i64) -> &[WorkflowActivity] {
        self.activities.get(&workflow_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn activities_by_workflow_name(&self, title: &str) -> Result<&[WorkflowActivity], ModelError> {
        let workflow = self.workflow_by_name(title)?;
        Ok(self.activities_by_workflow_id(workflow.id))
    }

    fn scoped_activities(&self, scope: ActivityScope<'_>) -> Result<Vec<&WorkflowActivity>, ModelError> {
        Ok(match scope {
            ActivityScope::All => self.activities.values().flatten().collect(),
            ActivityScope::WorkflowId(id) => self.activities_by_workflow_id(id).iter().collect(),
            ActivityScope::WorkflowName(title) => self.activities_by_workflow_name(title)?.iter().collect(),
        })
    }

    pub fn activity_by_id(&self, activity_id: i64, scope: ActivityScope<'_>) -> Result<&WorkflowActivity, ModelError> {
        self.scoped_activities(scope)?
            .into_iter()
            .find(|a| a.id == activity_id)
            .ok_or_else(|| ModelError::not_found(EntityKind::WorkflowActivity, LookupKey::Id, activity_id))
    }

    pub fn activity_by_name(&self, title: &str, scope: ActivityScope<'_>) -> Result<&WorkflowActivity, ModelError> {
        self.scoped_activities(scope)?
            .into_iter()
            .find(|a| a.title == title)
            .ok_or_else(|| ModelError::not_found(EntityKind::WorkflowActivity, LookupKey::Name, title))
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_document_type(&self) -> Option<&DocumentType> {
        self.selection
            .document_type_id
            .and_then(|id| self.document_type_by_id(id).ok())
    }

    pub fn selected_stamp(&self) -> Option<&DistributionStamp> {
        self.selection.stamp_id.and_then(|id| self.stamp_by_uuid(id).ok())
    }

    pub fn selected_workflow_chain(&self) -> Option<WorkflowChain> {
        self.selection.workflow_chain
    }

    pub fn select_document_type_by_id(&mut self, document_type_id: i64) -> Result<(), ModelError> {
        self.selection.document_type_id = Some(self.document_type_by_id(document_type_id)?.id);
        Ok(())
    }

    pub fn select_document_type_by_name(&mut self, name: &str) -> Result<(), ModelError> {
        self.selection.document_type_id = Some(self.document_type_by_name(name)?.id);
        Ok(())
    }

    pub fn select_stamp_by_security_id(&mut self, security_id: i64) -> Result<(), ModelError> {
        self.selection.stamp_id = Some(self.stamp_by_security_id(security_id)?.id);
        Ok(())
    }

    pub fn select_stamp_by_uuid(&mut self, stamp_id: Uuid) -> Result<(), ModelError> {
        self.selection.stamp_id = Some(self.stamp_by_uuid(stamp_id)?.id);
        Ok(())
    }

    pub fn select_stamp_by_name(&mut self, name: &str) -> Result<(), ModelError> {
        self.selection.stamp_id = Some(self.stamp_by_name(name)?.id);
        Ok(())
    }

    /// Select a document type or stamp by name, depending on `creation`
    pub fn set_selected_object_by_name(&mut self, creation: CreationType, name: &str) -> Result<(), ModelError> {
        match creation {
            CreationType::DocType => self.select_document_type_by_name(name),
            CreationType::DistStamp => self.select_stamp_by_name(name),
            other => Err(ModelError::InvalidCreationType(other.to_string())),
        }
    }

    /// Select a workflow chain by ids
    ///
    /// Every activity must belong to the workflow. Nothing changes unless
    /// all five ids resolve.
    pub fn select_workflow_chain(&mut self, chain: WorkflowChain) -> Result<(), ModelError> {
        self.workflow_by_id(chain.workflow_id)?;
        let scope = ActivityScope::WorkflowId(chain.workflow_id);
        for activity_id in [
            chain.staging_activity_id,
            chain.staged_activity_id,
            chain.success_activity_id,
            chain.failed_activity_id,
        ] {
            self.activity_by_id(activity_id, scope)?;
        }

        self.selection.workflow_chain = Some(chain);
        Ok(())
    }

    /// Select a workflow chain by workflow and activity titles
    pub fn select_workflow_chain_by_name(&mut self, names: WorkflowChainNames<'_>) -> Result<(), ModelError> {
        let workflow_id = self.workflow_by_name(names.workflow)?.id;
        let scope = ActivityScope::WorkflowId(workflow_id);

        let chain = WorkflowChain {
            workflow_id,
            staging_activity_id: self.activity_by_name(names.staging, scope)?.id,
            staged_activity_id: self.activity_by_name(names.staged, scope)?.id,
            success_activity_id: self.activity_by_name(names.success, scope)?.id,
            failed_activity_id: self.activity_by_name(names.failed, scope)?.id,
        };

        self.selection.workflow_chain = Some(chain);
        Ok(())
    }

    // =========================================================================
    // Stored procedures
    // =========================================================================

    /// Record whether each procedure exists
    ///
    /// Known procedures keep their action and identity flag; only `exists`
    /// is refreshed.
    pub async fn populate_sproc_info<S: AsRef<str>>(
        &mut self,
        backend: &dyn Backend,
        sproc_names: &[S],
    ) -> Result<(), GraphError> {
        tracing::info!(count = sproc_names.len(), "fetching stored procedure info");

        for name in sproc_names {
            let name = name.as_ref();
            let exists = backend.check_sproc_exists(name).await? > 0;
            tracing::info!(sproc = name, exists, "checked stored procedure");

            match self.sprocs.get_mut(name) {
                Some(info) => {
                    tracing::warn!(sproc = name, "stored procedure info already present, refreshing");
                    info.exists = exists;
                }
                None => {
                    self.sprocs.insert(name.to_string(), SprocInfo::new(name, exists));
                }
            }
        }
        Ok(())
    }

    pub fn sproc_info(&self, sproc_name: &str) -> Result<&SprocInfo, ModelError> {
        self.sprocs
            .get(sproc_name)
            .ok_or_else(|| ModelError::not_found(EntityKind::StoredProcedure, LookupKey::Name, sproc_name))
    }

    fn sproc_info_mut(&mut self, sproc_name: &str) -> Result<&mut SprocInfo, ModelError> {
        self.sprocs
            .get_mut(sproc_name)
            .ok_or_else(|| ModelError::not_found(EntityKind::StoredProcedure, LookupKey::Name, sproc_name))
    }

    /// All known procedures, ordered by name
    pub fn sprocs(&self) -> impl Iterator<Item = &SprocInfo> {
        self.sprocs.values()
    }

    pub fn sproc_exists(&self, sproc_name: &str) -> Result<bool, ModelError> {
        Ok(self.sproc_info(sproc_name)?.exists)
    }

    pub fn set_sproc_action(&mut self, sproc_name: &str, action: SprocAction) -> Result<(), ModelError> {
        self.sproc_info_mut(sproc_name)?.action = Some(action);
        Ok(())
    }

    pub fn set_sproc_identical(&mut self, sproc_name: &str, identical: bool) -> Result<(), ModelError> {
        self.sproc_info_mut(sproc_name)?.identical = Some(identical);
        Ok(())
    }

    // =========================================================================
    // Staging columns
    // =========================================================================

    /// Append chosen column names; append order is render order
    pub fn add_staging_table_columns<S: Into<String>>(&mut self, class: ColumnClass, columns: impl IntoIterator<Item = S>) {
        self.staging_columns
            .entry(class)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
    }

    pub fn staging_columns(&self, class: ColumnClass) -> &[String] {
        self.staging_columns.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear_staging_columns(&mut self) {
        self.staging_columns.clear();
    }
}
