//! Component converters
//!
//! A converter turns one component value into bytes and back. Pools hold an
//! optional converter; the encoding itself is up to the converter.

use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o failed during conversion: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ComponentConverter<T>: Send + Sync {
    fn serialize(&self, writer: &mut dyn Write, component: &T) -> Result<(), ConvertError>;
    fn deserialize(&self, reader: &mut dyn Read) -> Result<T, ConvertError>;
}

/// JSON encoding through serde_json.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentConverter<T> for JsonConverter<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, writer: &mut dyn Write, component: &T) -> Result<(), ConvertError> {
        serde_json::to_writer(writer, component)?;
        Ok(())
    }

    fn deserialize(&self, reader: &mut dyn Read) -> Result<T, ConvertError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamina {
        value: f32,
        regen: f32,
    }

    #[test]
    fn json_converter_writes_and_reads() {
        let converter = JsonConverter::<Stamina>::new();
        let mut bytes = Vec::new();
        converter
            .serialize(&mut bytes, &Stamina { value: 3.5, regen: 0.25 })
            .unwrap();
        assert_eq!(bytes, br#"{"value":3.5,"regen":0.25}"#);

        let back = converter.deserialize(&mut bytes.as_slice()).unwrap();
        assert_eq!(back, Stamina { value: 3.5, regen: 0.25 });
    }

    #[test]
    fn malformed_input_is_an_error() {
        let converter = JsonConverter::<Stamina>::new();
        let err = converter.deserialize(&mut &b"{\"value\":"[..]).unwrap_err();
        assert!(matches!(err, ConvertError::Json(_)));
    }
}
