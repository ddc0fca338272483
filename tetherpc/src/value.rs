use crate::error::{Error, ErrorKind, Result};

/// Runtime representation of a wire value.
///
/// A `Value` mirrors the type system of [`crate::TypeDesc`]: the codec encodes
/// a `Value` against a registered type and decoding produces the matching
/// variant. Enum values are carried as their underlying integer variant;
/// `Bytes` is the decoded form of `Array(U8)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Value>),
    Array(Vec<Value>),
    Nullable(Option<Box<Value>>),
    Record(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in codec error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::I8(_) => "i8",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::Array(_) => "array",
            Value::Nullable(_) => "nullable",
            Value::Record(_) => "record",
        }
    }

    pub fn some(value: Value) -> Value {
        Value::Nullable(Some(Box::new(value)))
    }

    pub const fn none() -> Value {
        Value::Nullable(None)
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::new(
            ErrorKind::InvalidArgument,
            format!("expected {expected}, got {}", self.kind_name()),
        )
    }
}

macro_rules! value_accessors {
    ($($variant:ident, $ty:ty, $as:ident, $name:literal;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl Value {
                /// # Errors
                pub fn $as(&self) -> Result<$ty> {
                    match self {
                        Value::$variant(v) => Ok(*v),
                        other => Err(other.mismatch($name)),
                    }
                }
            }
        )*
    };
}

value_accessors! {
    Bool, bool, as_bool, "bool";
    U8, u8, as_u8, "u8";
    I8, i8, as_i8, "i8";
    U16, u16, as_u16, "u16";
    I16, i16, as_i16, "i16";
    U32, u32, as_u32, "u32";
    I32, i32, as_i32, "i32";
    U64, u64, as_u64, "u64";
    I64, i64, as_i64, "i64";
    F32, f32, as_f32, "f32";
    F64, f64, as_f64, "f64";
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl Value {
    /// # Errors
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }

    /// # Errors
    pub fn into_str(self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }

    /// # Errors
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    /// # Errors
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    /// Members of a tuple or record, or the elements of an array.
    ///
    /// # Errors
    pub fn members(&self) -> Result<&[Value]> {
        match self {
            Value::Tuple(m) | Value::Array(m) | Value::Record(m) => Ok(m),
            other => Err(other.mismatch("tuple, array or record")),
        }
    }

    /// # Errors
    pub fn into_members(self) -> Result<Vec<Value>> {
        match self {
            Value::Tuple(m) | Value::Array(m) | Value::Record(m) => Ok(m),
            other => Err(other.mismatch("tuple, array or record")),
        }
    }

    /// # Errors
    pub fn as_nullable(&self) -> Result<Option<&Value>> {
        match self {
            Value::Nullable(v) => Ok(v.as_deref()),
            other => Err(other.mismatch("nullable")),
        }
    }
}
