//! In-memory fakes for tests and demos
//!
//! - [`MockBackend`] implements [`Backend`] over predefined entities
//! - [`MockTransport`] stands in for the HTTP client behind [`crate::ApiBackend`]
//! - [`MemoryConnection`] stands in for the database behind [`crate::SqlBackend`]
//!
//! ```rust,ignore
//! let backend = MockBackend::builder()
//!     .with_property(Property::new(1, "Invoice #", 0))
//!     .with_error("get_workflows", BackendError::Transport("timeout".into()))
//!     .build();
//! ```

use crate::api::{HttpMethod, HttpRequest, HttpTransport};
use crate::backend::{optional_table, Backend, Delivery, TableData};
use crate::error::BackendError;
use crate::sql::SqlConnection;
use doclink_core::{
    link_document_types, DistributionStamp, DistributionStampField, DocumentType, DocumentTypeRecord, Property,
    Workflow, WorkflowActivity,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend returning predefined entities
///
/// Every call is recorded by operation name; an error registered for an
/// operation is returned instead of its data.
pub struct MockBackend {
    name: &'static str,
    delivery: Delivery,
    properties: Vec<Property>,
    document_types: Vec<DocumentTypeRecord>,
    workflows: Vec<Workflow>,
    activities: Vec<WorkflowActivity>,
    ai_profiles: Vec<String>,
    event_tasks: Vec<String>,
    stamps: Vec<DistributionStamp>,
    stamp_fields: Vec<DistributionStampField>,
    sprocs: HashMap<String, String>,
    tables: HashMap<String, TableData>,
    errors: HashMap<&'static str, BackendError>,
    calls: Mutex<Vec<&'static str>>,
    executed: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder::new()
    }

    /// Operations called so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    /// Statements passed to `run_query`
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    fn enter(&self, operation: &'static str) -> Result<(), BackendError> {
        lock(&self.calls).push(operation);
        match self.errors.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }

    async fn get_properties(&self) -> Result<Vec<Property>, BackendError> {
        self.enter("get_properties")?;
        Ok(self.properties.clone())
    }

    async fn get_document_types_with_props(&self, properties: &[Property]) -> Result<Vec<DocumentType>, BackendError> {
        self.enter("get_document_types_with_props")?;
        Ok(link_document_types(self.document_types.clone(), Vec::new(), properties)?)
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, BackendError> {
        let result = self.enter("get_workflows").map(|_| self.workflows.clone());
        optional_table(result, "Workflows")
    }

    async fn get_workflow_activities(&self) -> Result<Vec<WorkflowActivity>, BackendError> {
        let result = self.enter("get_workflow_activities").map(|_| self.activities.clone());
        optional_table(result, "WorkflowActivities")
    }

    async fn get_ai_profiles(&self) -> Result<Vec<String>, BackendError> {
        self.enter("get_ai_profiles")?;
        Ok(self.ai_profiles.clone())
    }

    async fn get_event_task_names(&self) -> Result<Vec<String>, BackendError> {
        self.enter("get_event_task_names")?;
        Ok(self.event_tasks.clone())
    }

    async fn get_dist_stamps(&self) -> Result<Vec<DistributionStamp>, BackendError> {
        let result = self.enter("get_dist_stamps").map(|_| self.stamps.clone());
        optional_table(result, "DynamicUI")
    }

    async fn get_dist_stamp_fields(&self) -> Result<Vec<DistributionStampField>, BackendError> {
        let result = self.enter("get_dist_stamp_fields").map(|_| self.stamp_fields.clone());
        optional_table(result, "DynamicUIField")
    }

    async fn check_sproc_exists(&self, sproc_name: &str) -> Result<u32, BackendError> {
        self.enter("check_sproc_exists")?;
        Ok(u32::from(self.sprocs.contains_key(sproc_name)))
    }

    async fn table_whitelisted(&self, table: &str, _refresh: bool) -> Result<bool, BackendError> {
        self.enter("table_whitelisted")?;
        Ok(self.tables.contains_key(table))
    }

    async fn query_table(&self, table: &str) -> Result<TableData, BackendError> {
        self.enter("query_table")?;
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| BackendError::TableNotWhitelisted(table.to_string()))
    }

    async fn run_query(&self, query: &str) -> Result<(), BackendError> {
        self.enter("run_query")?;
        lock(&self.executed).push(query.to_string());
        Ok(())
    }

    async fn sproc_text(&self, sproc_name: &str) -> Result<String, BackendError> {
        self.enter("sproc_text")?;
        self.sprocs
            .get(sproc_name)
            .cloned()
            .ok_or_else(|| BackendError::InvalidResponse(format!("no text for procedure {}", sproc_name)))
    }
}

/// Builder for [`MockBackend`]
pub struct MockBackendBuilder {
    inner: MockBackend,
}

impl MockBackendBuilder {
    pub fn new() -> Self {
        Self {
            inner: MockBackend {
                name: "mock",
                delivery: Delivery::File,
                properties: Vec::new(),
                document_types: Vec::new(),
                workflows: Vec::new(),
                activities: Vec::new(),
                ai_profiles: Vec::new(),
                event_tasks: Vec::new(),
                stamps: Vec::new(),
                stamp_fields: Vec::new(),
                sprocs: HashMap::new(),
                tables: HashMap::new(),
                errors: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
            },
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.inner.name = name;
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.inner.delivery = delivery;
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.inner.properties.push(property);
        self
    }

    pub fn with_document_type(mut self, record: DocumentTypeRecord) -> Self {
        self.inner.document_types.push(record);
        self
    }

    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.inner.workflows.push(workflow);
        self
    }

    pub fn with_activity(mut self, activity: WorkflowActivity) -> Self {
        self.inner.activities.push(activity);
        self
    }

    pub fn with_ai_profile(mut self, name: impl Into<String>) -> Self {
        self.inner.ai_profiles.push(name.into());
        self
    }

    pub fn with_event_task(mut self, name: impl Into<String>) -> Self {
        self.inner.event_tasks.push(name.into());
        self
    }

    pub fn with_stamp(mut self, stamp: DistributionStamp) -> Self {
        self.inner.stamps.push(stamp);
        self
    }

    pub fn with_stamp_field(mut self, field: DistributionStampField) -> Self {
        self.inner.stamp_fields.push(field);
        self
    }

    /// Register an existing procedure and its definition text
    pub fn with_sproc(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.inner.sprocs.insert(name.into(), text.into());
        self
    }

    /// Whitelist a table and the rows `query_table` returns for it
    pub fn with_table(mut self, name: impl Into<String>, data: TableData) -> Self {
        self.inner.tables.insert(name.into(), data);
        self
    }

    /// Fail every call to `operation` with `error`
    pub fn with_error(mut self, operation: &'static str, error: BackendError) -> Self {
        self.inner.errors.insert(operation, error);
        self
    }

    /// Behave like a backend without administrative operations
    pub fn without_admin(mut self) -> Self {
        for operation in ["run_query", "sproc_text"] {
            let error = BackendError::unsupported(self.inner.name, operation);
            self.inner.errors.insert(operation, error);
        }
        self
    }

    pub fn build(self) -> MockBackend {
        self.inner
    }
}

impl Default for MockBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct TransportState {
    routes: Vec<(HttpMethod, String, Value)>,
    tables: HashMap<String, Value>,
    requests: Vec<HttpRequest>,
}

/// [`HttpTransport`] answering from canned responses
///
/// Routes match on method and URL suffix. `QueryTable` posts are answered
/// per `TableName` from [`MockTransport::with_table`]. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, method: HttpMethod, endpoint: &str, body: Value) -> Self {
        lock(&self.state).routes.push((method, endpoint.to_string(), body));
        self
    }

    pub fn with_table(self, table: &str, data: &TableData) -> Self {
        let body = serde_json::to_value(data).unwrap_or(Value::Null);
        lock(&self.state).tables.insert(table.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests whose URL ends with `endpoint`
    pub fn count(&self, endpoint: &str) -> usize {
        lock(&self.state).requests.iter().filter(|r| r.url.ends_with(endpoint)).count()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, BackendError> {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());

        if request.method == HttpMethod::Post && request.url.ends_with("QueryTable") {
            let table = request
                .body
                .as_ref()
                .and_then(|b| b.get("TableName"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if let Some(body) = state.tables.get(table) {
                return Ok(body.clone());
            }
        }

        state
            .routes
            .iter()
            .find(|(method, endpoint, _)| *method == request.method && request.url.ends_with(endpoint.as_str()))
            .map(|(_, _, body)| body.clone())
            .ok_or_else(|| BackendError::Transport(format!("404 Not Found: {}", request.url)))
    }
}

#[derive(Default)]
struct ConnectionState {
    results: Vec<(String, TableData)>,
    failing: HashSet<String>,
    statements: Vec<String>,
}

/// [`SqlConnection`] answering queries from canned result sets
///
/// A query returns the first registered result whose fragment it contains,
/// or an empty result. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<ConnectionState>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, fragment: &str, data: TableData) -> Self {
        lock(&self.state).results.push((fragment.to_string(), data));
        self
    }

    /// Fail any statement containing `fragment`
    pub fn failing_on(self, fragment: &str) -> Self {
        lock(&self.state).failing.insert(fragment.to_string());
        self
    }

    /// Every statement received, queries and executions alike
    pub fn statements(&self) -> Vec<String> {
        lock(&self.state).statements.clone()
    }

    fn receive(&self, sql: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.statements.push(sql.to_string());
        match state.failing.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(BackendError::Transport(format!("statement failed near '{}'", fragment))),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl SqlConnection for MemoryConnection {
    async fn query(&mut self, sql: &str) -> Result<TableData, BackendError> {
        self.receive(sql)?;
        let state = lock(&self.state);
        Ok(state
            .results
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, data)| data.clone())
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        self.receive(sql)?;
        Ok(0)
    }
}
