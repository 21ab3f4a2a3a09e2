//! Column classes and creation targets for staging exports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition of a staging export a column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnClass {
    Header,
    Detail,
}

impl fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Detail => write!(f, "detail"),
        }
    }
}

/// What a staging export is created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationType {
    /// Document type properties, resolved by formatted prompt
    DocType,

    /// Distribution stamp fields, resolved by caption
    DistStamp,

    /// ERP-specific export; no column resolution exists for it
    WennSoft,
}

impl fmt::Display for CreationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocType => write!(f, "doc_type"),
            Self::DistStamp => write!(f, "dist_stamp"),
            Self::WennSoft => write!(f, "wennsoft"),
        }
    }
}
