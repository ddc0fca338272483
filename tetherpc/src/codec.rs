use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;

use bytes::{BufMut, BytesMut};
use foldhash::fast::RandomState;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::{Error, ErrorKind, Result},
    schema::{PrimitiveKind, TypeDesc},
    value::Value,
};

/// Upper bound for decoded string byte lengths and array element counts.
/// A count above this is treated as stream corruption.
const MAX_COUNT: usize = 64 << 20;

/// Stable identity of a registered type.
///
/// Identities are assigned in worklist-discovery order, so a given interface
/// always produces the same id for the same type shape; client and server
/// agree without negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecId(u32);

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

/// Flattened form of a [`TypeDesc`]: children are registry references
/// instead of owned subtrees.
#[derive(Debug, Clone)]
enum TypeShape {
    Primitive(PrimitiveKind),
    Tuple(Vec<CodecId>),
    Array(CodecId),
    Nullable(CodecId),
    Enum(PrimitiveKind),
    Record(Vec<CodecId>),
}

/// Registry of every type reachable from an interface, keyed by structural
/// identity, with the encode/decode routines for each.
///
/// Encoding is synchronous into a [`BytesMut`] (a frame is always assembled
/// fully in memory before hitting the stream). Decoding is asynchronous
/// against the stream and reads exactly the bytes the type needs — frames
/// carry no length prefix, so the descriptors are the only source of field
/// extents.
pub struct CodecRegistry {
    shapes: Vec<TypeShape>,
    ids: HashMap<TypeDesc, CodecId, RandomState>,
}

impl CodecRegistry {
    /// Discovers every type reachable from `seeds` and assigns identities.
    ///
    /// Worklist algorithm: pop a type; if unseen, give it the next id and
    /// push every type it structurally references; repeat until empty.
    /// Structural deduplication makes this terminate on repeated shapes.
    ///
    /// # Errors
    ///
    /// Fails if an enum is declared over a non-integer kind.
    pub fn discover<'a>(seeds: impl IntoIterator<Item = &'a TypeDesc>) -> Result<Self> {
        let mut ids: HashMap<TypeDesc, CodecId, RandomState> = HashMap::default();
        let mut order: Vec<TypeDesc> = Vec::new();
        let mut worklist: VecDeque<TypeDesc> = seeds.into_iter().cloned().collect();

        while let Some(ty) = worklist.pop_front() {
            if ids.contains_key(&ty) {
                continue;
            }
            if let TypeDesc::Enum(kind) = &ty
                && !kind.is_integer()
            {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("enum underlying kind must be an integer, got {kind:?}"),
                ));
            }
            match &ty {
                TypeDesc::Primitive(_) | TypeDesc::Enum(_) => {}
                TypeDesc::Tuple(elements) => worklist.extend(elements.iter().cloned()),
                TypeDesc::Array(element) => worklist.push_back((**element).clone()),
                TypeDesc::Nullable(inner) => worklist.push_back((**inner).clone()),
                TypeDesc::Record(fields) => {
                    worklist.extend(fields.iter().map(|f| f.ty.clone()));
                }
            }
            ids.insert(ty.clone(), CodecId(order.len() as u32));
            order.push(ty);
        }

        // Second pass: every child is registered now, resolve the shapes.
        let shapes = order
            .iter()
            .map(|ty| {
                let resolve = |child: &TypeDesc| ids[child];
                match ty {
                    TypeDesc::Primitive(kind) => TypeShape::Primitive(*kind),
                    TypeDesc::Enum(kind) => TypeShape::Enum(*kind),
                    TypeDesc::Tuple(elements) => {
                        TypeShape::Tuple(elements.iter().map(resolve).collect())
                    }
                    TypeDesc::Array(element) => TypeShape::Array(resolve(element)),
                    TypeDesc::Nullable(inner) => TypeShape::Nullable(resolve(inner)),
                    TypeDesc::Record(fields) => {
                        TypeShape::Record(fields.iter().map(|f| resolve(&f.ty)).collect())
                    }
                }
            })
            .collect();

        Ok(Self { shapes, ids })
    }

    #[must_use]
    pub fn id_of(&self, ty: &TypeDesc) -> Option<CodecId> {
        self.ids.get(ty).copied()
    }

    /// # Errors
    pub(crate) fn require(&self, ty: &TypeDesc) -> Result<CodecId> {
        self.id_of(ty).ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, format!("unregistered type: {ty:?}"))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    fn shape(&self, id: CodecId) -> Result<&TypeShape> {
        self.shapes
            .get(id.0 as usize)
            .ok_or_else(|| Error::new(ErrorKind::DecodeFailed, format!("invalid {id}")))
    }

    /// Encodes `value` as the registered type `id` into `buf`.
    ///
    /// # Errors
    ///
    /// Fails if the value's shape does not match the declared type.
    pub fn encode(&self, buf: &mut BytesMut, id: CodecId, value: &Value) -> Result<()> {
        match self.shape(id)? {
            TypeShape::Primitive(kind) | TypeShape::Enum(kind) => {
                encode_primitive(buf, *kind, value)
            }
            TypeShape::Tuple(elements) => {
                let members = value.members()?;
                if members.len() != elements.len() {
                    return Err(Error::new(
                        ErrorKind::EncodeFailed,
                        format!(
                            "tuple arity mismatch: expected {}, got {}",
                            elements.len(),
                            members.len()
                        ),
                    ));
                }
                for (element, member) in elements.iter().zip(members) {
                    self.encode(buf, *element, member)?;
                }
                Ok(())
            }
            TypeShape::Record(fields) => {
                let members = value.members()?;
                if members.len() != fields.len() {
                    return Err(Error::new(
                        ErrorKind::EncodeFailed,
                        format!(
                            "record field count mismatch: expected {}, got {}",
                            fields.len(),
                            members.len()
                        ),
                    ));
                }
                for (field, member) in fields.iter().zip(members) {
                    self.encode(buf, *field, member)?;
                }
                Ok(())
            }
            TypeShape::Array(element) => match value {
                Value::Bytes(bytes) if self.is_byte_element(*element) => {
                    buf.put_u32_le(u32::try_from(bytes.len())?);
                    buf.put_slice(bytes);
                    Ok(())
                }
                Value::Array(items) => {
                    buf.put_u32_le(u32::try_from(items.len())?);
                    for item in items {
                        self.encode(buf, *element, item)?;
                    }
                    Ok(())
                }
                other => Err(Error::new(
                    ErrorKind::EncodeFailed,
                    format!("expected array, got {}", other.kind_name()),
                )),
            },
            TypeShape::Nullable(inner) => match value {
                Value::Nullable(None) => {
                    buf.put_u8(0);
                    Ok(())
                }
                Value::Nullable(Some(inner_value)) => {
                    buf.put_u8(1);
                    self.encode(buf, *inner, inner_value)
                }
                other => Err(Error::new(
                    ErrorKind::EncodeFailed,
                    format!("expected nullable, got {}", other.kind_name()),
                )),
            },
        }
    }

    /// Decodes one value of the registered type `id` from the stream.
    ///
    /// # Errors
    ///
    /// Truncated or malformed input fails with [`ErrorKind::DecodeFailed`];
    /// the caller must treat that as fatal to the connection.
    pub async fn decode<R>(&self, reader: &mut R, id: CodecId) -> Result<Value>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        self.decode_boxed(reader, id).await
    }

    // Composite decoding recurses through the registry; boxing keeps the
    // recursive future sized.
    fn decode_boxed<'a, R>(
        &'a self,
        reader: &'a mut R,
        id: CodecId,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        Box::pin(async move {
            match self.shape(id)? {
                TypeShape::Primitive(kind) | TypeShape::Enum(kind) => {
                    decode_primitive(reader, *kind).await
                }
                TypeShape::Tuple(elements) => {
                    let mut members = Vec::with_capacity(elements.len());
                    for element in elements {
                        members.push(self.decode_boxed(reader, *element).await?);
                    }
                    Ok(Value::Tuple(members))
                }
                TypeShape::Record(fields) => {
                    let mut members = Vec::with_capacity(fields.len());
                    for field in fields {
                        members.push(self.decode_boxed(reader, *field).await?);
                    }
                    Ok(Value::Record(members))
                }
                TypeShape::Array(element) => {
                    let count = read_count(reader).await?;
                    if self.is_byte_element(*element) {
                        let mut bytes = vec![0u8; count];
                        reader
                            .read_exact(&mut bytes)
                            .await
                            .map_err(decode_io_error)?;
                        Ok(Value::Bytes(bytes))
                    } else {
                        let mut items = Vec::with_capacity(count.min(1024));
                        for _ in 0..count {
                            items.push(self.decode_boxed(reader, *element).await?);
                        }
                        Ok(Value::Array(items))
                    }
                }
                TypeShape::Nullable(inner) => match read_u8(reader).await? {
                    0 => Ok(Value::Nullable(None)),
                    1 => {
                        let value = self.decode_boxed(reader, *inner).await?;
                        Ok(Value::Nullable(Some(Box::new(value))))
                    }
                    flag => Err(Error::new(
                        ErrorKind::DecodeFailed,
                        format!("invalid presence flag: {flag}"),
                    )),
                },
            }
        })
    }

    fn is_byte_element(&self, id: CodecId) -> bool {
        matches!(
            self.shapes.get(id.0 as usize),
            Some(TypeShape::Primitive(PrimitiveKind::U8))
        )
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.shapes.len())
            .finish()
    }
}

fn encode_primitive(buf: &mut BytesMut, kind: PrimitiveKind, value: &Value) -> Result<()> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(v)) => buf.put_u8(u8::from(*v)),
        (PrimitiveKind::U8, Value::U8(v)) => buf.put_u8(*v),
        (PrimitiveKind::I8, Value::I8(v)) => buf.put_i8(*v),
        (PrimitiveKind::U16, Value::U16(v)) => buf.put_u16_le(*v),
        (PrimitiveKind::I16, Value::I16(v)) => buf.put_i16_le(*v),
        (PrimitiveKind::U32, Value::U32(v)) => buf.put_u32_le(*v),
        (PrimitiveKind::I32, Value::I32(v)) => buf.put_i32_le(*v),
        (PrimitiveKind::U64, Value::U64(v)) => buf.put_u64_le(*v),
        (PrimitiveKind::I64, Value::I64(v)) => buf.put_i64_le(*v),
        (PrimitiveKind::F32, Value::F32(v)) => buf.put_f32_le(*v),
        (PrimitiveKind::F64, Value::F64(v)) => buf.put_f64_le(*v),
        (PrimitiveKind::Str, Value::Str(s)) => put_string(buf, s)?,
        (kind, other) => {
            return Err(Error::new(
                ErrorKind::EncodeFailed,
                format!("expected {kind:?}, got {}", other.kind_name()),
            ));
        }
    }
    Ok(())
}

async fn decode_primitive<R>(reader: &mut R, kind: PrimitiveKind) -> Result<Value>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    macro_rules! read_le {
        ($ty:ty, $variant:ident) => {{
            let mut bytes = [0u8; size_of::<$ty>()];
            reader
                .read_exact(&mut bytes)
                .await
                .map_err(decode_io_error)?;
            Ok(Value::$variant(<$ty>::from_le_bytes(bytes)))
        }};
    }

    match kind {
        PrimitiveKind::Bool => match read_u8(reader).await? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            byte => Err(Error::new(
                ErrorKind::DecodeFailed,
                format!("invalid bool byte: {byte}"),
            )),
        },
        PrimitiveKind::U8 => Ok(Value::U8(read_u8(reader).await?)),
        PrimitiveKind::I8 => read_le!(i8, I8),
        PrimitiveKind::U16 => read_le!(u16, U16),
        PrimitiveKind::I16 => read_le!(i16, I16),
        PrimitiveKind::U32 => read_le!(u32, U32),
        PrimitiveKind::I32 => read_le!(i32, I32),
        PrimitiveKind::U64 => read_le!(u64, U64),
        PrimitiveKind::I64 => read_le!(i64, I64),
        PrimitiveKind::F32 => read_le!(f32, F32),
        PrimitiveKind::F64 => read_le!(f64, F64),
        PrimitiveKind::Str => Ok(Value::Str(read_string(reader).await?)),
    }
}

/// Appends a u32-count-prefixed UTF-8 string.
pub(crate) fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    buf.put_u32_le(u32::try_from(s.len())?);
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Reads a u32-count-prefixed UTF-8 string.
pub(crate) async fn read_string<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let len = read_count(reader).await?;
    let mut bytes = vec![0u8; len];
    reader
        .read_exact(&mut bytes)
        .await
        .map_err(decode_io_error)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::new(ErrorKind::DecodeFailed, format!("invalid utf-8: {e}")))
}

pub(crate) async fn read_u8<R>(reader: &mut R) -> Result<u8>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut byte = [0u8; 1];
    reader
        .read_exact(&mut byte)
        .await
        .map_err(decode_io_error)?;
    Ok(byte[0])
}

async fn read_count<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .await
        .map_err(decode_io_error)?;
    let count = u32::from_le_bytes(bytes) as usize;
    if count > MAX_COUNT {
        return Err(Error::new(
            ErrorKind::DecodeFailed,
            format!("count too large: {count}"),
        ));
    }
    Ok(count)
}

pub(crate) fn decode_io_error(e: std::io::Error) -> Error {
    Error::new(ErrorKind::DecodeFailed, e.to_string())
}
