//! Distribution stamps and their fields

use crate::error::ModelError;
use crate::format::{format_identifier, reference_fragment, typed_fragment, SqlType, FRAGMENT_SEPARATOR};
use crate::serde_util::{flexible_bool, null_default};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A field on a distribution stamp form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionStampField {
    #[serde(rename = "DynamicUIFieldId")]
    pub id: i64,

    /// Owning stamp
    #[serde(rename = "DynamicUIId")]
    pub stamp_id: Uuid,

    #[serde(default, deserialize_with = "null_default")]
    pub name: String,

    #[serde(deserialize_with = "null_default")]
    pub caption: String,

    #[serde(default, deserialize_with = "null_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_default")]
    pub sequence: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub section: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub property_id: i64,

    pub data_type: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub decimal_places: i32,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub required: bool,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub visible: bool,
}

impl DistributionStampField {
    pub fn new(id: i64, stamp_id: Uuid, caption: impl Into<String>, data_type: i32) -> Self {
        Self {
            id,
            stamp_id,
            name: String::new(),
            caption: caption.into(),
            description: String::new(),
            sequence: 0,
            section: 0,
            property_id: 0,
            data_type,
            decimal_places: 0,
            required: false,
            visible: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Caption formatted as a column identifier
    pub fn user_prompt(&self) -> String {
        format_identifier(&self.caption)
    }

    pub fn sql_type(&self) -> Result<SqlType, ModelError> {
        SqlType::for_stamp_field(self.data_type)
    }

    /// Column expression selecting this field from the pivot source
    ///
    /// Numeric fields strip thousands separators before the value is
    /// converted.
    pub fn select_expression(&self) -> Result<String, ModelError> {
        match self.sql_type()? {
            SqlType::DecimalNull => Ok(format!(
                ",REPLACE([{}],'','','''') --{}",
                self.id,
                self.user_prompt()
            )),
            _ => Ok(format!(",[{}] --{}", self.id, self.user_prompt())),
        }
    }

    pub fn typed_fragment(&self) -> Result<String, ModelError> {
        Ok(typed_fragment(&self.user_prompt(), self.sql_type()?))
    }

    pub fn reference_fragment(&self) -> String {
        reference_fragment(&self.user_prompt())
    }

    /// Select expression followed by the fragment separator
    pub fn id_fragment(&self) -> Result<String, ModelError> {
        Ok(format!("{}{}", self.select_expression()?, FRAGMENT_SEPARATOR))
    }
}

/// A distribution stamp form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionStamp {
    #[serde(rename = "DynamicUiId")]
    pub id: Uuid,

    #[serde(rename = "DynamicUISecurityId", default, deserialize_with = "null_default")]
    pub security_id: i64,

    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub description: String,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub can_attach: bool,

    /// Attached by [`link_distribution_stamps`], never read from a row
    #[serde(skip_deserializing, default)]
    pub fields: Vec<DistributionStampField>,
}

impl DistributionStamp {
    pub fn new(id: Uuid, security_id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            security_id,
            name: name.into(),
            description: String::new(),
            can_attach: false,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<DistributionStampField>) -> Self {
        self.fields = fields;
        self
    }
}

/// Attach fields to their stamps by parent UUID
///
/// Returns an empty list when either input is empty. Field order within a
/// stamp follows the input order.
pub fn link_distribution_stamps(
    stamps: Vec<DistributionStamp>,
    fields: Vec<DistributionStampField>,
) -> Vec<DistributionStamp> {
    if stamps.is_empty() || fields.is_empty() {
        return Vec::new();
    }

    let mut by_stamp: HashMap<Uuid, Vec<DistributionStampField>> = HashMap::new();
    for field in fields {
        by_stamp.entry(field.stamp_id).or_default().push(field);
    }

    stamps
        .into_iter()
        .map(|stamp| {
            let fields = by_stamp.remove(&stamp.id).unwrap_or_default();
            stamp.with_fields(fields)
        })
        .collect()
}
