//! Direct SQL Server backend
//!
//! Reads metadata straight from the DocLink database and runs the
//! administrative statements the HTTP API does not expose. Generated
//! artifacts are committed through the connection.
//!
//! ## Features
//!
//! The `tiberius` connection is compiled with the `mssql` feature; tests
//! use [`crate::MemoryConnection`].

use crate::backend::{AccessibleItems, Backend, Delivery, RiSchedule, TableData};
use crate::cache::AccessibleItemsCache;
use crate::error::BackendError;
use crate::journal::TransactionJournal;
use crate::queries::{self, sql_literal, validate_identifier};
use doclink_core::{
    link_document_types, DistributionStamp, DistributionStampField, DocumentType, DocumentTypePropertyRecord,
    DocumentTypeRecord, Property, SqlSettings, Workflow, WorkflowActivity,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

#[cfg(feature = "mssql")]
use tiberius::{AuthMethod, Client, ColumnData, Config as TdsConfig, FromSql};
#[cfg(feature = "mssql")]
use tokio::net::TcpStream;
#[cfg(feature = "mssql")]
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// A live database connection
#[async_trait::async_trait]
pub trait SqlConnection: Send {
    /// Run a batch and return its last result set
    async fn query(&mut self, sql: &str) -> Result<TableData, BackendError>;

    /// Run a batch that returns no rows, yielding the affected row count
    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError>;
}

pub struct SqlBackend {
    connection: Mutex<Option<Box<dyn SqlConnection>>>,
    accessible: AccessibleItemsCache,
    journal: Option<TransactionJournal>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RiScheduleRow {
    processing_interval: i32,
    processing_interval_type: i32,
}

impl SqlBackend {
    /// Backend with no connection; every call fails with `NoConnection` until one is attached
    pub fn new(whitelist_ttl: Duration) -> Self {
        Self {
            connection: Mutex::new(None),
            accessible: AccessibleItemsCache::new(whitelist_ttl),
            journal: None,
        }
    }

    pub fn with_connection(self, connection: Box<dyn SqlConnection>) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
            ..self
        }
    }

    pub fn with_journal(mut self, journal: TransactionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Connect with `tiberius`
    #[cfg(feature = "mssql")]
    pub async fn connect(&self, settings: &SqlSettings, password: Option<&str>) -> Result<(), BackendError> {
        let password = password.ok_or(BackendError::NoCredentials("SQL"))?;
        tracing::info!(server = %settings.server, database = %settings.database, "connecting to SQL Server");

        let connection = TiberiusConnection::connect(settings, password).await?;
        *self.connection.lock().await = Some(Box::new(connection));
        self.accessible.invalidate().await;
        Ok(())
    }

    /// Connect without the mssql feature (returns error)
    #[cfg(not(feature = "mssql"))]
    pub async fn connect(&self, _settings: &SqlSettings, _password: Option<&str>) -> Result<(), BackendError> {
        Err(BackendError::Config(
            "SQL Server support not compiled. Rebuild with: cargo build --features mssql".to_string(),
        ))
    }

    pub async fn disconnect(&self) {
        if self.connection.lock().await.take().is_some() {
            tracing::info!("disconnected from SQL Server");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    fn record(&self, entry: &str) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }

    async fn query_all(&self, sql: &str) -> Result<TableData, BackendError> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(BackendError::NoConnection)?;

        let data = connection.query(sql).await?;
        self.record(sql);
        self.record(&format!("Results: {} row(s)", data.rows.len()));
        Ok(data)
    }

    async fn commit(&self, sql: &str) -> Result<u64, BackendError> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(BackendError::NoConnection)?;

        self.record(sql);
        connection.execute(sql).await
    }

    /// Run an insert and return the identity it generated
    async fn insert_returning_identity(&self, sql: &str) -> Result<i64, BackendError> {
        let data = self.query_all(&format!("{}\n{}", sql.trim_end(), queries::SCOPE_IDENTITY)).await?;
        let identity = scalar_i64(&data)?;
        self.record(&format!("Identity: {}", identity));
        Ok(identity)
    }

    async fn count(&self, sql: &str) -> Result<i64, BackendError> {
        let data = self.query_all(sql).await?;
        scalar_i64(&data)
    }

    async fn accessible_items(&self, refresh: bool) -> Result<AccessibleItems, BackendError> {
        self.accessible
            .get_or_fetch(refresh, || async move {
                let tables = self.query_all(queries::LIST_TABLES).await?.first_column();
                let procedures = self.query_all(queries::LIST_PROCEDURES).await?.first_column();
                Ok::<_, BackendError>(AccessibleItems { tables, procedures })
            })
            .await
    }
}

fn scalar(data: &TableData) -> Result<&serde_json::Value, BackendError> {
    data.rows
        .first()
        .and_then(|row| row.first())
        .ok_or_else(|| BackendError::InvalidResponse("query returned no rows".to_string()))
}

fn scalar_i64(data: &TableData) -> Result<i64, BackendError> {
    let value = scalar(data)?;
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| BackendError::InvalidResponse(format!("expected an integer, got {}", value)))
}

#[async_trait::async_trait]
impl Backend for SqlBackend {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn delivery(&self) -> Delivery {
        Delivery::Commit
    }

    async fn get_properties(&self) -> Result<Vec<Property>, BackendError> {
        tracing::debug!("getting database properties");
        self.query_all(queries::GET_PROPERTIES).await?.records()
    }

    async fn get_document_types_with_props(&self, properties: &[Property]) -> Result<Vec<DocumentType>, BackendError> {
        tracing::debug!("getting document types with properties");
        let records: Vec<DocumentTypeRecord> = self.query_all(queries::GET_DOCUMENT_TYPES).await?.records()?;
        let detached: Vec<DocumentTypePropertyRecord> =
            self.query_all(queries::GET_DOCUMENT_TYPE_PROPERTIES).await?.records()?;
        Ok(link_document_types(records, detached, properties)?)
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, BackendError> {
        self.query_all(queries::GET_WORKFLOWS).await?.records()
    }

    async fn get_workflow_activities(&self) -> Result<Vec<WorkflowActivity>, BackendError> {
        self.query_all(queries::GET_WORKFLOW_ACTIVITIES).await?.records()
    }

    async fn get_ai_profiles(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.query_all(queries::GET_AI_PROFILE_NAMES).await?.first_column())
    }

    async fn get_event_task_names(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.query_all(queries::GET_EVENT_TASK_NAMES).await?.first_column())
    }

    async fn get_dist_stamps(&self) -> Result<Vec<DistributionStamp>, BackendError> {
        self.query_all(queries::GET_DIST_STAMPS).await?.records()
    }

    async fn get_dist_stamp_fields(&self) -> Result<Vec<DistributionStampField>, BackendError> {
        self.query_all(queries::GET_DIST_STAMP_FIELDS).await?.records()
    }

    async fn check_sproc_exists(&self, sproc_name: &str) -> Result<u32, BackendError> {
        let name = validate_identifier(sproc_name)?;
        tracing::debug!(sproc = name, "checking if procedure exists");
        let data = self.query_all(&queries::sproc_exists(name)).await?;
        Ok(data.rows.len() as u32)
    }

    async fn table_whitelisted(&self, table: &str, refresh: bool) -> Result<bool, BackendError> {
        Ok(self.accessible_items(refresh).await?.has_table(table))
    }

    async fn query_table(&self, table: &str) -> Result<TableData, BackendError> {
        let table = validate_identifier(table)?;
        if !self.table_whitelisted(table, false).await? {
            return Err(BackendError::TableNotWhitelisted(table.to_string()));
        }
        self.query_all(&queries::select_table(table)).await
    }

    async fn run_query(&self, query: &str) -> Result<(), BackendError> {
        self.commit(query).await.map(|_| ())
    }

    async fn drop_staging_tables(&self) -> Result<(), BackendError> {
        tracing::info!("dropping staging tables");
        self.commit(queries::DROP_STAGING_TABLES).await.map(|_| ())
    }

    async fn sproc_text(&self, sproc_name: &str) -> Result<String, BackendError> {
        let name = validate_identifier(sproc_name)?;
        let data = self.query_all(&queries::sproc_text(name)).await?;
        Ok(data.first_column().concat())
    }

    async fn enable_ai_for_document_type(&self, doc_type_id: i64) -> Result<(), BackendError> {
        self.commit(&queries::enable_ai(doc_type_id)).await.map(|_| ())
    }

    async fn enable_ri_for_document_type(&self, doc_type_id: i64, ri_method: i32) -> Result<(), BackendError> {
        self.commit(&queries::enable_ri(doc_type_id, ri_method)).await.map(|_| ())
    }

    async fn ri_schedule(&self, doc_type_id: i64) -> Result<Option<RiSchedule>, BackendError> {
        let rows: Vec<RiScheduleRow> = self.query_all(&queries::get_ri_schedule(doc_type_id)).await?.records()?;
        Ok(rows.into_iter().next().map(|row| RiSchedule {
            processing_interval: row.processing_interval,
            processing_interval_type: row.processing_interval_type,
        }))
    }

    async fn create_ri_schedule(&self, doc_type_id: i64, schedule: RiSchedule) -> Result<(), BackendError> {
        let sql = queries::insert_ri_schedule(doc_type_id, schedule.processing_interval, schedule.processing_interval_type);
        self.commit(&sql).await.map(|_| ())
    }

    async fn update_ri_schedule(&self, doc_type_id: i64, schedule: RiSchedule) -> Result<(), BackendError> {
        let sql = queries::update_ri_schedule(doc_type_id, schedule.processing_interval, schedule.processing_interval_type);
        self.commit(&sql).await.map(|_| ())
    }

    async fn create_auto_index(&self, name: &str, script: &str) -> Result<i64, BackendError> {
        self.insert_returning_identity(&queries::add_auto_index(&sql_literal(name), &sql_literal(script)))
            .await
    }

    async fn attach_auto_index_to_doc_type(
        &self,
        doc_type_id: i64,
        ai_profile_id: i64,
        execution_context: i32,
    ) -> Result<i64, BackendError> {
        let sequence = self.count(&queries::count_doc_type_auto_indexes(doc_type_id)).await? + 1;
        let sql = queries::add_doc_type_auto_index(doc_type_id, sequence, ai_profile_id, execution_context);
        self.insert_returning_identity(&sql).await
    }

    async fn add_auto_index_return_property(
        &self,
        ai_profile_id: i64,
        property_id: i64,
        column_name: &str,
    ) -> Result<(), BackendError> {
        let sql = queries::add_return_property(ai_profile_id, property_id, &sql_literal(column_name));
        self.commit(&sql).await.map(|_| ())
    }

    async fn create_triggered_event(&self, task_name: &str, activity_id: i64, start_active: bool) -> Result<i64, BackendError> {
        let sequence = self.count(&queries::count_tasks_with_activity(activity_id)).await? + 1;
        let sql = queries::add_trigger_event(&sql_literal(task_name), activity_id, start_active, sequence);
        self.insert_returning_identity(&sql).await
    }

    async fn create_scheduled_event(&self, task_name: &str, start_active: bool) -> Result<i64, BackendError> {
        self.insert_returning_identity(&queries::add_event_config(&sql_literal(task_name), start_active))
            .await
    }

    async fn add_event_database_action(&self, event_id: i64, action_name: &str, sproc_name: &str) -> Result<i64, BackendError> {
        let sproc = validate_identifier(sproc_name)?;
        let sql = queries::add_database_action(event_id, &sql_literal(action_name), sproc);
        self.insert_returning_identity(&sql).await
    }

    async fn add_event_db_action_param(&self, action_id: i64, param_name: &str, param_value: &str) -> Result<(), BackendError> {
        let sql = queries::add_db_action_parameter(action_id, &sql_literal(param_name), &sql_literal(param_value));
        self.commit(&sql).await.map(|_| ())
    }

    async fn add_schedule_for_event_by_task_id(
        &self,
        task_id: i64,
        interval_period: i32,
        interval_type: i32,
    ) -> Result<String, BackendError> {
        let data = self.query_all(&queries::event_config_id_for_task(task_id)).await?;
        let config_id = match scalar(&data)? {
            serde_json::Value::String(s) => s.clone(),
            other => return Err(BackendError::InvalidResponse(format!("expected a configuration id, got {}", other))),
        };

        let sql = queries::add_event_schedule(&sql_literal(&config_id), interval_period, interval_type);
        self.commit(&sql).await?;
        Ok(config_id)
    }
}

/// [`SqlConnection`] over a `tiberius` client
#[cfg(feature = "mssql")]
pub struct TiberiusConnection {
    client: Client<Compat<TcpStream>>,
}

#[cfg(feature = "mssql")]
impl TiberiusConnection {
    pub async fn connect(settings: &SqlSettings, password: &str) -> Result<Self, BackendError> {
        let mut config = TdsConfig::new();
        config.host(&settings.server);
        config.port(settings.port);
        config.database(&settings.database);
        config.authentication(AuthMethod::sql_server(&settings.username, password));
        if settings.trust_cert {
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to reach {}:{}: {}", settings.server, settings.port, e)))?;
        tcp.set_nodelay(true).map_err(|e| BackendError::Transport(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to connect to SQL Server: {}", e)))?;

        Ok(Self { client })
    }
}

#[cfg(feature = "mssql")]
#[async_trait::async_trait]
impl SqlConnection for TiberiusConnection {
    async fn query(&mut self, sql: &str) -> Result<TableData, BackendError> {
        let results = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?
            .into_results()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let Some(rows) = results.into_iter().filter(|set| !set.is_empty()).last() else {
            return Ok(TableData::default());
        };

        let columns: Vec<&str> = rows[0].columns().iter().map(|c| c.name()).collect();
        let mut data = TableData::new(&columns, Vec::with_capacity(rows.len()));

        for row in rows {
            data.rows.push(row.into_iter().map(cell_to_json).collect());
        }
        Ok(data)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        let result = self
            .client
            .execute(sql, &[])
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(result.total())
    }
}

#[cfg(feature = "mssql")]
fn cell_to_json(data: ColumnData<'static>) -> serde_json::Value {
    use serde_json::Value;

    match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(Value::from),
        ColumnData::F64(v) => v.map(Value::from),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Numeric(v) => v.map(|n| Value::String(n.to_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            chrono::NaiveDateTime::from_sql(&data)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_string()))
        }
        _ => None,
    }
    .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryConnection;
    use serde_json::json;

    fn backend(connection: &MemoryConnection) -> SqlBackend {
        SqlBackend::new(Duration::from_secs(300)).with_connection(Box::new(connection.clone()))
    }

    #[tokio::test]
    async fn calls_without_connection_fail() {
        let sql = SqlBackend::new(Duration::from_secs(300));
        assert_eq!(sql.get_properties().await.unwrap_err(), BackendError::NoConnection);
        assert_eq!(sql.run_query("SELECT 1").await.unwrap_err(), BackendError::NoConnection);
    }

    #[tokio::test]
    async fn sproc_exists_counts_rows() {
        let connection = MemoryConnection::new().with_result(
            "OBJECT_ID(N'[dbo].[spExport]')",
            TableData::new(&["name"], vec![vec![json!("spExport")]]),
        );
        let sql = backend(&connection);

        assert_eq!(sql.check_sproc_exists("spExport").await.unwrap(), 1);
        assert_eq!(sql.check_sproc_exists("spOther").await.unwrap(), 0);
        assert_eq!(
            sql.check_sproc_exists("sp; DROP TABLE x").await.unwrap_err(),
            BackendError::InvalidIdentifier("sp; DROP TABLE x".into())
        );
    }

    #[tokio::test]
    async fn query_table_checks_whitelist() {
        let connection = MemoryConnection::new()
            .with_result("sys.tables", TableData::new(&["name"], vec![vec![json!("Workflows")]]))
            .with_result("[dbo].[Workflows]", TableData::new(&["WorkflowID", "Title"], vec![vec![json!(1), json!("AP")]]));
        let sql = backend(&connection);

        assert_eq!(sql.query_table("Workflows").await.unwrap().rows.len(), 1);
        assert!(sql.query_table("Secrets").await.unwrap_err().is_not_whitelisted());
    }

    #[tokio::test]
    async fn sproc_text_is_concatenated() {
        let connection = MemoryConnection::new().with_result(
            "sp_helptext spExport",
            TableData::new(&["Text"], vec![vec![json!("CREATE PROCEDURE spExport\r\n")], vec![json!("AS SELECT 1\r\n")]]),
        );

        let text = backend(&connection).sproc_text("spExport").await.unwrap();
        assert_eq!(text, "CREATE PROCEDURE spExport\r\nAS SELECT 1\r\n");
    }

    #[tokio::test]
    async fn create_auto_index_quotes_and_returns_identity() {
        let connection = MemoryConnection::new()
            .with_result("SCOPE_IDENTITY()", TableData::new(&["Id"], vec![vec![json!(42)]]));
        let sql = backend(&connection);

        let id = sql.create_auto_index("Export", "exec p ''%DocumentID%''").await.unwrap();
        assert_eq!(id, 42);

        let statement = connection.statements().pop().unwrap();
        assert!(statement.contains("'Export' , 10000 , NULL , 'exec p ''''%DocumentID%''''', 0 , 1"));
        assert!(statement.ends_with(queries::SCOPE_IDENTITY));
    }

    #[tokio::test]
    async fn schedule_by_task_id_uses_config_id() {
        let connection = MemoryConnection::new().with_result(
            "EventAutomatedTaskID = 9",
            TableData::new(&["EventConfigurationID"], vec![vec![json!("6F9619FF-8B86-D011-B42D-00C04FC964FF")]]),
        );
        let sql = backend(&connection);

        let config_id = sql.add_schedule_for_event_by_task_id(9, 15, 2).await.unwrap();
        assert_eq!(config_id, "6F9619FF-8B86-D011-B42D-00C04FC964FF");

        let insert = connection.statements().pop().unwrap();
        assert!(insert.contains("15, 0, 0, 0, 0, 0, 2, '6F9619FF-8B86-D011-B42D-00C04FC964FF', 0, 60, 0"));
    }

    #[tokio::test]
    async fn ri_schedule_absent_and_present() {
        let connection = MemoryConnection::new().with_result(
            "ParentId = 7",
            TableData::new(
                &["ProcessingInterval", "ProcessingIntervalType"],
                vec![vec![json!(30), json!(1)]],
            ),
        );
        let sql = backend(&connection);

        assert_eq!(
            sql.ri_schedule(7).await.unwrap(),
            Some(RiSchedule { processing_interval: 30, processing_interval_type: 1 })
        );
        assert_eq!(sql.ri_schedule(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn statements_are_journaled() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TransactionJournal::new(dir.path().join("transactions.txt"));
        let connection = MemoryConnection::new();
        let sql = backend(&connection).with_journal(journal.clone());

        sql.enable_ai_for_document_type(12).await.unwrap();

        let text = std::fs::read_to_string(journal.path()).unwrap();
        assert!(text.contains("AIEnabled = 1"));
        assert!(text.contains("WHERE DocumentTypeId = 12;"));
    }
}
