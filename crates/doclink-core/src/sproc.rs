//! Stored procedure bookkeeping

use serde::{Deserialize, Serialize};
use std::fmt;

/// DDL verb substituted into a procedure template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SprocAction {
    Create,
    Alter,
    Drop,
}

impl SprocAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Drop => "DROP",
        }
    }

    /// Action that applies a template to a procedure in the given state
    pub fn for_existing(exists: bool) -> Self {
        if exists {
            Self::Alter
        } else {
            Self::Create
        }
    }
}

impl fmt::Display for SprocAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SprocAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "ALTER" => Ok(Self::Alter),
            "DROP" => Ok(Self::Drop),
            other => Err(format!("unknown procedure action '{}'", other)),
        }
    }
}

/// What is known about one stored procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprocInfo {
    pub name: String,

    /// Present in the database
    pub exists: bool,

    /// Database text matches the rendered template; unknown until checked
    pub identical: Option<bool>,

    /// Unset until explicitly chosen
    pub action: Option<SprocAction>,
}

impl SprocInfo {
    pub fn new(name: impl Into<String>, exists: bool) -> Self {
        Self {
            name: name.into(),
            exists,
            identical: None,
            action: None,
        }
    }
}
