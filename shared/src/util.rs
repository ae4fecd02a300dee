use serde::{Deserialize, Deserializer};

/// Deserialize an explicit `null` column as the type's default.
///
/// The REST store returns `null` for columns that were never written, which
/// `#[serde(default)]` alone does not cover.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
