//! Serialize u64 values (seeds, fire ticks) as strings so they survive
//! JSON consumers that truncate integers above 2^53. Deserialization accepts
//! either form.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TickInput {
        Text(String),
        Number(u64),
    }

    match TickInput::deserialize(deserializer)? {
        TickInput::Text(raw) => raw.parse::<u64>().map_err(D::Error::custom),
        TickInput::Number(value) => Ok(value),
    }
}
