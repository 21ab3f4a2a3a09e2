//! SQL text run by the SQL backend
//!
//! Builders take values that were already validated or quoted with
//! [`sql_literal`]; none of them quote their arguments.

use crate::error::BackendError;
use regex::Regex;
use std::sync::LazyLock;

pub const SCHEMA_NAME: &str = "dbo";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub const GET_PROPERTIES: &str = "
SELECT
PropertyId, Created, Modified, ParentId, ModifiedBy, PropertyName, UserPrompt,
DataType, PropertyTag, DecimalPlaces, HasLookup, SystemLookupId,
DisplayFieldName as FieldName, ShowLookupButton, UseHotKey, CausesValidation, ValidationSql,
ControlType, EditWidth, HiddenProperty
FROM [dbo].[Propertys]";

pub const GET_DOCUMENT_TYPES: &str = "
SELECT
DocumentTypeId, Created, Modified, ParentID, ModifiedBy, Name, Description,
KeyDocumentTypePropertyGUID, DocumentTypeGUID, DocumentTypeTag, AIEnabled,
AIObjectProgID, RIEnabled, RIMethod, AIMethod, Active, AIAfterManualIndexAction,
FTEnabled as FullTextEnabled
FROM [dbo].[DocumentTypes];";

pub const GET_DOCUMENT_TYPE_PROPERTIES: &str = "SELECT * FROM [dbo].[DocumentTypePropertys]";
pub const GET_WORKFLOWS: &str = "SELECT * from [dbo].[Workflows]";
pub const GET_WORKFLOW_ACTIVITIES: &str = "SELECT * from [dbo].[WorkflowActivities]";
pub const GET_DIST_STAMPS: &str = "SELECT * FROM DynamicUI";
pub const GET_DIST_STAMP_FIELDS: &str = "SELECT * FROM DynamicUIField";
pub const GET_AI_PROFILE_NAMES: &str = "SELECT ProfileName FROM AIProfiles";
pub const GET_EVENT_TASK_NAMES: &str = "SELECT Name FROM EventAutomatedTasks";
pub const LIST_TABLES: &str = "SELECT name FROM sys.tables";
pub const LIST_PROCEDURES: &str = "SELECT name FROM sys.procedures";
pub const SCOPE_IDENTITY: &str = "SELECT CAST(SCOPE_IDENTITY() AS bigint) AS Id;";

pub const DROP_STAGING_TABLES: &str = "
IF EXISTS (SELECT 1 FROM sys.tables WHERE name = 'Custom_StagingTable_Header' AND schema_id = SCHEMA_ID('dbo'))
BEGIN
    DROP TABLE Custom_StagingTable_Header, Custom_StagingTable_Details;
END
IF EXISTS (SELECT 1 FROM sys.tables WHERE name = 'Custom_StagingTable_Details' AND schema_id = SCHEMA_ID('dbo'))
BEGIN
    DROP TABLE Custom_StagingTable_Details;
END
";

/// Quote a value for use inside a `'...'` or `N'...'` literal
pub fn sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Check that `name` is a plain SQL identifier
pub fn validate_identifier(name: &str) -> Result<&str, BackendError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(BackendError::InvalidIdentifier(name.to_string()))
    }
}

pub fn sproc_exists(sproc_name: &str) -> String {
    format!(
        "SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'[{}].[{}]') AND type = N'P'",
        SCHEMA_NAME, sproc_name
    )
}

pub fn select_table(table: &str) -> String {
    format!("SELECT * FROM [{}].[{}]", SCHEMA_NAME, table)
}

pub fn sproc_text(sproc_name: &str) -> String {
    format!("EXEC sp_helptext {}", sproc_name)
}

pub fn enable_ai(doc_type_id: i64) -> String {
    format!(
        "
UPDATE [dbo].[DocumentTypes]
Set
    Modified = GETDATE(),
    AIEnabled = 1
WHERE DocumentTypeId = {};
",
        doc_type_id
    )
}

pub fn enable_ri(doc_type_id: i64, ri_method: i32) -> String {
    format!(
        "
UPDATE [dbo].[DocumentTypes]
Set
    Modified = GETDATE(),
    RIEnabled = 1,
    RIMethod = {}
WHERE DocumentTypeId = {};
",
        ri_method, doc_type_id
    )
}

pub fn get_ri_schedule(doc_type_id: i64) -> String {
    format!(
        "SELECT ProcessingInterval, ProcessingIntervalType FROM [dbo].[RISchedules] WHERE ParentId = {};",
        doc_type_id
    )
}

pub fn insert_ri_schedule(doc_type_id: i64, interval: i32, interval_type: i32) -> String {
    format!(
        "
INSERT INTO [dbo].[RISchedules]
( Created , Modified , ParentId , ModifiedBy , TimeToRun , LastTimeRun ,
DeferDays , DaysInQueue , ReportFailures , UpdateRIQueue , ScheduleType ,
ProcessingInterval , ProcessingIntervalType , ProcessNow ,
PriorityProcessNewDocs , PriorityProcessDelay)
VALUES
( GETDATE() , GETDATE() , {} , -1 , NULL , NULL ,
0 , 3 , 0 , NULL , 2 ,
{} , {} , 0 ,
0 , 0 );
",
        doc_type_id, interval, interval_type
    )
}

pub fn update_ri_schedule(doc_type_id: i64, interval: i32, interval_type: i32) -> String {
    format!(
        "
UPDATE [dbo].[RISchedules]
Set
    Modified = GETDATE(),
    ScheduleType = 2,
    ProcessingInterval = {},
    ProcessingIntervalType = {}
WHERE ParentId = {};
",
        interval, interval_type, doc_type_id
    )
}

pub fn add_auto_index(name: &str, script: &str) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT into AIProfiles ( Created , Modified , ModifiedBy , ProfileName , DataSourceID , SourceTable , QueryText , SingleTable , PropsInNotReq)
VALUES ( GETDATE() , GETDATE() , -1 , '{}' , 10000 , NULL , '{}', 0 , 1 );
",
        name, script
    )
}

pub fn count_doc_type_auto_indexes(doc_type_id: i64) -> String {
    format!("SELECT COUNT(*) from DocTypeAIProfiles where ParentId = '{}'", doc_type_id)
}

pub fn add_doc_type_auto_index(doc_type_id: i64, sequence: i64, ai_profile_id: i64, execution_context: i32) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO [dbo].[DocTypeAIProfiles]([Created],[Modified],[ParentId],[ModifiedBy],[FolderID],[Sequence],[AIProfileID]
    ,[ExitOnSuccess],[ExecutionContext],[SkipOnDocTypeProperty],[SkipOnDocTypePropID])
VALUES (GETDATE(),GETDATE(),{},-1,-1,{},{},0,{},0,NULL);
",
        doc_type_id, sequence, ai_profile_id, execution_context
    )
}

pub fn add_return_property(ai_profile_id: i64, property_id: i64, column_name: &str) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT into AIOutputProperties ( Created , Modified , ParentId , ModifiedBy , Sequence , PropertyID , SourceColName , ScriptText , ReplaceExistingValues)
VALUES (GETDATE(), GETDATE(), {} , -1 , 0 , {}, '{}' , NULL , NULL );
",
        ai_profile_id, property_id, column_name
    )
}

pub fn count_tasks_with_activity(activity_id: i64) -> String {
    format!(
        "SELECT COUNT(*) from EventAutomatedTasks where WorkflowActivityID = '{}'",
        activity_id
    )
}

pub fn add_trigger_event(task_name: &str, activity_id: i64, start_active: bool, sequence: i64) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO EventAutomatedTasks
    (Created, Modified, ModifiedBy, Name, Description, AppEventID, WorkflowActivityID, RuleXml, RuleSet, Enabled, Seq, ExitCode, EventConfigurationID)
VALUES
    (GETDATE(), GETDATE(), -1, N'{}', NULL, 5, {}, NULL, NULL, {}, {}, 0, NEWID())
",
        task_name,
        activity_id,
        i32::from(start_active),
        sequence
    )
}

/// Schedule-driven events are not tied to a workflow, so their sequence is 0
pub fn add_event_config(task_name: &str, start_active: bool) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO EventAutomatedTasks
    (Created, Modified, ModifiedBy, Name, Description, AppEventID, WorkflowActivityID, RuleXml, RuleSet, Enabled, Seq, ExitCode, EventConfigurationID)
VALUES
    (GETDATE(), GETDATE(), -1, N'{}', NULL, 12, NULL, NULL, NULL, {}, 0, 0, NEWID())
",
        task_name,
        i32::from(start_active)
    )
}

pub fn add_database_action(event_id: i64, action_name: &str, sproc_name: &str) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO EventDatabaseActions
    (Created, Modified, ModifiedBy, EventAutomatedTaskID, Name, ProcedureName, RuleXml, RuleSet, Seq, ExitCode, ParentCondition, ExecutionTimeOut)
VALUES
    (GETDATE(), GETDATE(), -1, {}, N'{}', N'{}', NULL, NULL, 1, 0, 1, 60);
",
        event_id, action_name, sproc_name
    )
}

pub fn add_db_action_parameter(action_id: i64, param_name: &str, param_value: &str) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO EventDatabaseActionParameters
    (Created, Modified, ModifiedBy, EventDatabaseActionID, Name, DataType, ValueToken)
VALUES
    (GETDATE(), GETDATE(), -1, {}, N'{}', N'number', N'{}');
",
        action_id, param_name, param_value
    )
}

pub fn event_config_id_for_task(task_id: i64) -> String {
    format!(
        "SELECT EventConfigurationID FROM EventAutomatedTasks WHERE EventAutomatedTaskID = {}",
        task_id
    )
}

pub fn add_event_schedule(event_config_id: &str, interval_period: i32, interval_type: i32) -> String {
    format!(
        "
SET NOCOUNT ON;
INSERT INTO EventSchedules
    (Created, Modified, ModifiedBy, IntervalType, StartTime, EndTime, ScheduleInterval, WeekDaysSelected, RecurrenceIntervalType, RecurrenceInterval, RecurrenceDay, MonthsSelected, DailyTimePeriod, EventConfigurationID, EnforceMaxRunTime, MaxRunTimeInterval, MaxRunTimeIntervalType)
VALUES
    (GETDATE(), GETDATE(), -1, 0, NULL, NULL, {}, 0, 0, 0, 0, 0, {}, '{}', 0, 60, 0);
",
        interval_period, interval_type, event_config_id
    )
}
