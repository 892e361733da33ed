use std::fmt;

/// The fixed set of storage-native column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageKind {
    /// Column type used in `CREATE TABLE`.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A storage-native column value.
#[derive(Debug, Clone, Default)]
pub enum SqlValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Null => StorageKind::Null,
            Self::Integer(_) => StorageKind::Integer,
            Self::Real(_) => StorageKind::Real,
            Self::Text(_) => StorageKind::Text,
            Self::Blob(_) => StorageKind::Blob,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().sql_type()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits() || a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<u32> for SqlValue {
    fn from(i: u32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<usize> for SqlValue {
    fn from(i: usize) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        Self::Real(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Integer(b as i64)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<rusqlite::types::ValueRef<'_>> for SqlValue {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            // Invalid UTF-8 stays raw so decoding reports it against the field.
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Self::Text(text.to_string()),
                Err(_) => Self::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(SqlValue::Integer(42), SqlValue::Integer(42));
        assert_eq!(SqlValue::Real(3.5), SqlValue::Real(3.5));
        assert_ne!(SqlValue::Integer(1), SqlValue::Real(1.0));
        assert_ne!(SqlValue::Text("1".into()), SqlValue::Integer(1));
    }

    #[test]
    fn test_bool_and_option_conversion() {
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn test_invalid_utf8_text_is_kept_as_bytes() {
        use rusqlite::types::ValueRef;
        assert_eq!(
            SqlValue::from(ValueRef::Text(b"caf\xc3\xa9")),
            SqlValue::Text("caf\u{e9}".into())
        );
        assert_eq!(
            SqlValue::from(ValueRef::Text(&[0x66, 0xff, 0xfe])),
            SqlValue::Blob(vec![0x66, 0xff, 0xfe])
        );
    }

    #[test]
    fn test_integral_real_reads_as_integer() {
        assert_eq!(SqlValue::Real(4.0).as_i64(), Some(4));
        assert_eq!(SqlValue::Real(4.5).as_i64(), None);
    }
}
