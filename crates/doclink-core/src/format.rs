//! Identifier formatting, SQL type mapping and column fragments
//!
//! Every fragment rendered for a column starts with a `,` and ends with
//! [`FRAGMENT_SEPARATOR`]. Concatenated fragments are trimmed exactly once
//! with [`trim_separator`].

use crate::error::{EntityKind, ModelError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminator appended to every rendered column fragment
pub const FRAGMENT_SEPARATOR: &str = "\r\n\t";

/// Turn a user prompt or caption into a SQL column identifier
///
/// Spaces are removed and `#` becomes `No`, so `"Invoice #"` formats to
/// `"InvoiceNo"`.
pub fn format_identifier(raw: &str) -> String {
    raw.replace(' ', "").replace('#', "No").trim().to_string()
}

/// Remove one trailing [`FRAGMENT_SEPARATOR`] from a concatenated render
///
/// Interior separators are never touched and input without the separator is
/// returned unchanged.
pub fn trim_separator(rendered: &str) -> &str {
    rendered.strip_suffix(FRAGMENT_SEPARATOR).unwrap_or(rendered)
}

/// `,[<prompt>] <type>` fragment used in column declarations
pub fn typed_fragment(prompt: &str, sql_type: SqlType) -> String {
    format!(",[{}] {}{}", prompt, sql_type, FRAGMENT_SEPARATOR)
}

/// `,[<prompt>]` fragment used in plain column lists
pub fn reference_fragment(prompt: &str) -> String {
    format!(",[{}]{}", prompt, FRAGMENT_SEPARATOR)
}

/// `,[<id>]` fragment used in pivot identifier lists
pub fn id_fragment(id: impl fmt::Display) -> String {
    format!(",[{}]{}", id, FRAGMENT_SEPARATOR)
}

/// SQL Server column types emitted for staging tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// `[varchar](250) NULL`
    VarcharNull,

    /// `[int] NULL`
    IntNull,

    /// `[datetime] NULL`
    DatetimeNull,

    /// `[decimal](18, 2) NULL`
    DecimalNull,

    /// `[datetime]`
    Datetime,

    /// `[smallint]`
    Smallint,
}

impl SqlType {
    /// Map a property data-type code
    pub fn for_property(code: i32) -> Result<Self, ModelError> {
        match code {
            0 | 3 => Ok(Self::VarcharNull),
            1 => Ok(Self::IntNull),
            2 => Ok(Self::DatetimeNull),
            4 => Ok(Self::DecimalNull),
            _ => Err(ModelError::InvalidDataType {
                kind: EntityKind::Property,
                code,
            }),
        }
    }

    /// Map a distribution stamp field data-type code
    ///
    /// Differs from [`SqlType::for_property`]: code 1 is a decimal, code 2 is
    /// a non-null datetime and code 3 is a smallint.
    pub fn for_stamp_field(code: i32) -> Result<Self, ModelError> {
        match code {
            0 => Ok(Self::VarcharNull),
            1 | 4 => Ok(Self::DecimalNull),
            2 => Ok(Self::Datetime),
            3 => Ok(Self::Smallint),
            _ => Err(ModelError::InvalidDataType {
                kind: EntityKind::DistributionStampField,
                code,
            }),
        }
    }

    /// Column type as written in DDL
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::VarcharNull => "[varchar](250) NULL",
            Self::IntNull => "[int] NULL",
            Self::DatetimeNull => "[datetime] NULL",
            Self::DecimalNull => "[decimal](18, 2) NULL",
            Self::Datetime => "[datetime]",
            Self::Smallint => "[smallint]",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_formatting() {
        assert_eq!(format_identifier("Invoice #"), "InvoiceNo");
        assert_eq!(format_identifier("Amount Due"), "AmountDue");
        assert_eq!(format_identifier("  PO # Line "), "PONoLine");
        assert_eq!(format_identifier("Vendor\t"), "Vendor");
    }

    #[test]
    fn property_type_mapping_is_total() {
        let expected = [
            (0, "[varchar](250) NULL"),
            (1, "[int] NULL"),
            (2, "[datetime] NULL"),
            (3, "[varchar](250) NULL"),
            (4, "[decimal](18, 2) NULL"),
        ];
        for (code, sql) in expected {
            assert_eq!(SqlType::for_property(code).unwrap().as_sql(), sql);
        }

        for code in [-1, 5, 99] {
            assert_eq!(
                SqlType::for_property(code),
                Err(ModelError::InvalidDataType { kind: EntityKind::Property, code })
            );
        }
    }

    #[test]
    fn stamp_field_type_mapping_is_total() {
        let expected = [
            (0, "[varchar](250) NULL"),
            (1, "[decimal](18, 2) NULL"),
            (2, "[datetime]"),
            (3, "[smallint]"),
            (4, "[decimal](18, 2) NULL"),
        ];
        for (code, sql) in expected {
            assert_eq!(SqlType::for_stamp_field(code).unwrap().as_sql(), sql);
        }

        assert_eq!(
            SqlType::for_stamp_field(7),
            Err(ModelError::InvalidDataType { kind: EntityKind::DistributionStampField, code: 7 })
        );
    }

    #[test]
    fn separator_trimming() {
        let rendered = format!("{}{}", reference_fragment("A"), reference_fragment("B"));
        assert_eq!(trim_separator(&rendered), ",[A]\r\n\t,[B]");

        // A second trim has nothing left to remove
        let once = trim_separator(&rendered);
        assert_eq!(trim_separator(once), once);

        assert_eq!(trim_separator(""), "");
    }

    #[test]
    fn fragments() {
        assert_eq!(typed_fragment("Total", SqlType::DecimalNull), ",[Total] [decimal](18, 2) NULL\r\n\t");
        assert_eq!(id_fragment(42), ",[42]\r\n\t");
    }
}
