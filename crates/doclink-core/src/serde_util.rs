//! Serde helpers for backend rows
//!
//! Database rows carry `NULL` for columns the HTTP API omits entirely; both
//! must deserialize to the field's default.

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as `T::default()`
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a SQL `bit` that may arrive as a bool or as 0/1
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<BoolOrInt>::deserialize(deserializer)? {
        Some(BoolOrInt::Bool(b)) => b,
        Some(BoolOrInt::Int(i)) => i != 0,
        None => false,
    })
}
