//! Document properties

use crate::error::ModelError;
use crate::format::{format_identifier, id_fragment, reference_fragment, typed_fragment, SqlType};
use crate::serde_util::{flexible_bool, null_default};
use serde::{Deserialize, Serialize};

/// A property that can be indexed on a document
///
/// The formatted user prompt is the column identifier used in every SQL
/// artifact generated for the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Property {
    pub property_id: i64,

    #[serde(default, deserialize_with = "null_default")]
    pub created: String,

    #[serde(default, deserialize_with = "null_default")]
    pub modified: String,

    #[serde(default, deserialize_with = "null_default")]
    pub parent_id: i64,

    #[serde(default, deserialize_with = "null_default")]
    pub property_name: String,

    #[serde(deserialize_with = "null_default")]
    pub user_prompt: String,

    pub data_type: i32,

    #[serde(default, deserialize_with = "null_default")]
    pub property_tag: String,

    #[serde(default, deserialize_with = "null_default")]
    pub decimal_places: i32,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_lookup: bool,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub hidden_property: bool,

    #[serde(default, deserialize_with = "null_default")]
    pub field_name: String,
}

impl Property {
    pub fn new(property_id: i64, user_prompt: impl Into<String>, data_type: i32) -> Self {
        Self {
            property_id,
            created: String::new(),
            modified: String::new(),
            parent_id: 0,
            property_name: String::new(),
            user_prompt: user_prompt.into(),
            data_type,
            property_tag: String::new(),
            decimal_places: 0,
            has_lookup: false,
            hidden_property: false,
            field_name: String::new(),
        }
    }

    pub fn with_name(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = property_name.into();
        self
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Prompt with spaces removed and `#` spelled `No`
    pub fn formatted_prompt(&self) -> String {
        format_identifier(&self.user_prompt)
    }

    pub fn sql_type(&self) -> Result<SqlType, ModelError> {
        SqlType::for_property(self.data_type)
    }

    /// `,[<prompt>] <type>` declaration fragment
    pub fn typed_fragment(&self) -> Result<String, ModelError> {
        Ok(typed_fragment(&self.formatted_prompt(), self.sql_type()?))
    }

    pub fn reference_fragment(&self) -> String {
        reference_fragment(&self.formatted_prompt())
    }

    pub fn id_fragment(&self) -> String {
        id_fragment(self.property_id)
    }
}
