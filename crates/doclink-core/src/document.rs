//! Document types and their ordered properties

use crate::error::{EntityKind, LookupKey, ModelError};
use crate::property::Property;
use crate::serde_util::{flexible_bool, null_default};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw document-type-property row as returned by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentTypePropertyRecord {
    pub document_type_property_id: i64,

    /// Owning document type
    pub parent_id: i64,

    pub property_id: i64,

    #[serde(default, deserialize_with = "null_default")]
    pub sequence_number: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub indexing_relevance: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub property_type: i32,

    #[serde(rename = "DocumentTypePropertyGUID", default, deserialize_with = "null_default")]
    pub guid: String,

    #[serde(rename = "ParentDocumentTypePropertyGUID", default, deserialize_with = "null_default")]
    pub parent_guid: String,
}

impl DocumentTypePropertyRecord {
    pub fn new(document_type_property_id: i64, parent_id: i64, property_id: i64, sequence_number: i32) -> Self {
        Self {
            document_type_property_id,
            parent_id,
            property_id,
            sequence_number,
            indexing_relevance: 0,
            property_type: 0,
            guid: String::new(),
            parent_guid: String::new(),
        }
    }
}

/// A property attached to a document type
///
/// Always carries its resolved [`Property`]; a row whose property id is
/// unknown cannot be turned into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTypeProperty {
    pub id: i64,
    pub parent_id: i64,
    pub sequence_number: i32,
    pub property_type: i32,
    pub guid: String,
    pub property: Property,
}

impl DocumentTypeProperty {
    /// Resolve a raw row against the known properties
    pub fn resolve(record: DocumentTypePropertyRecord, properties: &[Property]) -> Result<Self, ModelError> {
        let property = properties
            .iter()
            .find(|p| p.property_id == record.property_id)
            .cloned()
            .ok_or_else(|| ModelError::not_found(EntityKind::Property, LookupKey::Id, record.property_id))?;

        Ok(Self {
            id: record.document_type_property_id,
            parent_id: record.parent_id,
            sequence_number: record.sequence_number,
            property_type: record.property_type,
            guid: record.guid,
            property,
        })
    }

    /// Formatted prompt of the underlying property
    pub fn name(&self) -> String {
        self.property.formatted_prompt()
    }
}

/// Raw document type row
///
/// The HTTP API nests the property rows; the database returns them from a
/// separate table, in which case `document_type_properties` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentTypeRecord {
    pub document_type_id: i64,

    #[serde(rename = "ParentID", default, deserialize_with = "null_default")]
    pub parent_id: i64,

    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub description: String,

    #[serde(rename = "DocumentTypeGUID", default, deserialize_with = "null_default")]
    pub guid: String,

    #[serde(default, deserialize_with = "null_default")]
    pub document_type_tag: String,

    #[serde(rename = "AIEnabled", default, deserialize_with = "flexible_bool")]
    pub ai_enabled: bool,

    #[serde(rename = "RIEnabled", default, deserialize_with = "flexible_bool")]
    pub ri_enabled: bool,

    #[serde(rename = "RIMethod", default, deserialize_with = "null_default")]
    pub ri_method: i32,

    #[serde(rename = "AIMethod", default, deserialize_with = "null_default")]
    pub ai_method: i32,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub active: bool,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub full_text_enabled: bool,

    #[serde(default, deserialize_with = "null_default")]
    pub document_type_properties: Vec<DocumentTypePropertyRecord>,
}

impl DocumentTypeRecord {
    pub fn new(document_type_id: i64, name: impl Into<String>) -> Self {
        Self {
            document_type_id,
            parent_id: 0,
            name: name.into(),
            description: String::new(),
            guid: String::new(),
            document_type_tag: String::new(),
            ai_enabled: false,
            ri_enabled: false,
            ri_method: 0,
            ai_method: 0,
            active: true,
            full_text_enabled: false,
            document_type_properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, record: DocumentTypePropertyRecord) -> Self {
        self.document_type_properties.push(record);
        self
    }
}

/// A document type with its properties ordered by sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentType {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub description: String,
    pub guid: String,
    pub ai_enabled: bool,
    pub ri_enabled: bool,
    pub ri_method: i32,
    pub ai_method: i32,
    pub active: bool,
    pub full_text_enabled: bool,
    pub properties: Vec<DocumentTypeProperty>,
}

impl DocumentType {
    /// Build a document type, resolving every property row
    ///
    /// Fails on the first row whose property id is unknown.
    pub fn resolve(
        record: DocumentTypeRecord,
        property_records: impl IntoIterator<Item = DocumentTypePropertyRecord>,
        properties: &[Property],
    ) -> Result<Self, ModelError> {
        let mut resolved = property_records
            .into_iter()
            .map(|r| DocumentTypeProperty::resolve(r, properties))
            .collect::<Result<Vec<_>, _>>()?;
        resolved.sort_by_key(|dtp| dtp.sequence_number);

        Ok(Self {
            id: record.document_type_id,
            parent_id: record.parent_id,
            name: record.name,
            description: record.description,
            guid: record.guid,
            ai_enabled: record.ai_enabled,
            ri_enabled: record.ri_enabled,
            ri_method: record.ri_method,
            ai_method: record.ai_method,
            active: record.active,
            full_text_enabled: record.full_text_enabled,
            properties: resolved,
        })
    }

    /// Find an attached property by its formatted prompt
    pub fn property_by_name(&self, name: &str) -> Result<&DocumentTypeProperty, ModelError> {
        let name = name.trim();
        self.properties
            .iter()
            .find(|dtp| dtp.name() == name)
            .ok_or_else(|| ModelError::not_found(EntityKind::DocumentTypeProperty, LookupKey::Name, name))
    }
}

/// Link document type rows with their property rows
///
/// Nested rows (HTTP API) and detached rows (database, matched on
/// `parent_id`) are both accepted; detached rows follow nested ones before
/// the stable sort by sequence number.
pub fn link_document_types(
    records: Vec<DocumentTypeRecord>,
    detached: Vec<DocumentTypePropertyRecord>,
    properties: &[Property],
) -> Result<Vec<DocumentType>, ModelError> {
    let mut by_parent: HashMap<i64, Vec<DocumentTypePropertyRecord>> = HashMap::new();
    for record in detached {
        by_parent.entry(record.parent_id).or_default().push(record);
    }

    records
        .into_iter()
        .map(|mut record| {
            let mut rows = std::mem::take(&mut record.document_type_properties);
            if let Some(extra) = by_parent.remove(&record.document_type_id) {
                rows.extend(extra);
            }
            DocumentType::resolve(record, rows, properties)
        })
        .collect()
}
