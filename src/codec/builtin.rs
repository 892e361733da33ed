use super::{Codec, CodecError};
use crate::core::{SqlValue, StorageKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use uuid::Uuid;

/// `DateTime<Utc>` as epoch milliseconds. Sub-millisecond precision is lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCodec;

impl Codec for DateTimeCodec {
    type Value = DateTime<Utc>;

    fn serialized_kind(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn serialize(&self, value: &DateTime<Utc>) -> Result<SqlValue, CodecError> {
        Ok(SqlValue::Integer(value.timestamp_millis()))
    }

    fn deserialize(&self, value: SqlValue) -> Result<DateTime<Utc>, CodecError> {
        let millis = value
            .as_i64()
            .ok_or_else(|| CodecError::unexpected(StorageKind::Integer, &value))?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| CodecError::new(format!("timestamp {} out of range", millis)))
    }

    fn is_lossy(&self) -> bool {
        true
    }
}

/// `NaiveDate` as `YYYY-MM-DD` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveDateCodec;

impl Codec for NaiveDateCodec {
    type Value = NaiveDate;

    fn serialized_kind(&self) -> StorageKind {
        StorageKind::Text
    }

    fn serialize(&self, value: &NaiveDate) -> Result<SqlValue, CodecError> {
        Ok(SqlValue::Text(value.format("%Y-%m-%d").to_string()))
    }

    fn deserialize(&self, value: SqlValue) -> Result<NaiveDate, CodecError> {
        let text = value
            .as_str()
            .ok_or_else(|| CodecError::unexpected(StorageKind::Text, &value))?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|err| CodecError::new(format!("invalid date '{}': {}", text, err)))
    }
}

/// `Uuid` in its hyphenated text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    type Value = Uuid;

    fn serialized_kind(&self) -> StorageKind {
        StorageKind::Text
    }

    fn serialize(&self, value: &Uuid) -> Result<SqlValue, CodecError> {
        Ok(SqlValue::Text(value.to_string()))
    }

    fn deserialize(&self, value: SqlValue) -> Result<Uuid, CodecError> {
        let text = value
            .as_str()
            .ok_or_else(|| CodecError::unexpected(StorageKind::Text, &value))?;
        Uuid::parse_str(text)
            .map_err(|err| CodecError::new(format!("invalid uuid '{}': {}", text, err)))
    }
}

/// Any serde type stored as JSON text.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = T;

    fn serialized_kind(&self) -> StorageKind {
        StorageKind::Text
    }

    fn serialize(&self, value: &T) -> Result<SqlValue, CodecError> {
        Ok(SqlValue::Text(serde_json::to_string(value)?))
    }

    fn deserialize(&self, value: SqlValue) -> Result<T, CodecError> {
        let text = value
            .as_str()
            .ok_or_else(|| CodecError::unexpected(StorageKind::Text, &value))?;
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_datetime_millis_round_trip() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let stored = DateTimeCodec.serialize(&now).unwrap();
        assert_eq!(stored, SqlValue::Integer(1_700_000_000_123));
        assert_eq!(DateTimeCodec.deserialize(stored).unwrap(), now);
    }

    #[test]
    fn test_naive_date_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let stored = NaiveDateCodec.serialize(&date).unwrap();
        assert_eq!(stored, SqlValue::Text("2024-02-29".into()));
        assert!(NaiveDateCodec
            .deserialize(SqlValue::Text("2024-02-30".into()))
            .is_err());
    }

    #[test]
    fn test_uuid_rejects_integer() {
        let err = UuidCodec.deserialize(SqlValue::Integer(3)).unwrap_err();
        assert!(err.message.contains("expected TEXT"));
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Settings {
        theme: String,
        size: u32,
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec::<Settings>::new();
        let settings = Settings {
            theme: "dark".into(),
            size: 12,
        };
        let stored = codec.serialize(&settings).unwrap();
        assert_eq!(
            stored,
            SqlValue::Text(r#"{"theme":"dark","size":12}"#.into())
        );
        assert_eq!(codec.deserialize(stored).unwrap(), settings);
    }
}
