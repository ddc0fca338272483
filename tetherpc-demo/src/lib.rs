//! Sample interface for the tetherpc demo: the schema declaration plus the
//! typed stubs a code generator would emit for it — a client wrapper with
//! one async method per interface method, and `fire_*` helpers for the
//! server side.

use tetherpc::{
    Client, Error, ErrorKind, InterfaceSchema, PrimitiveKind, RecordField, Result, SchemaBuilder,
    ServerHandle, TypeDesc, Value,
};

/// Sample enum, carried on the wire as its underlying `u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Shade {
    Red = 0,
    Green = 1,
    Blue = 2,
    Ultra = 3,
}

impl Shade {
    /// # Errors
    pub fn from_value(value: &Value) -> Result<Self> {
        match value.as_u8()? {
            0 => Ok(Shade::Red),
            1 => Ok(Shade::Green),
            2 => Ok(Shade::Blue),
            3 => Ok(Shade::Ultra),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("invalid shade: {other}"),
            )),
        }
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        Value::U8(self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inner {
    pub a: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub a: i32,
    pub b: String,
    pub inner: Inner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub c: String,
    pub d: u64,
    pub inner: Inner,
}

impl Inner {
    #[must_use]
    pub fn to_value(self) -> Value {
        Value::Record(vec![self.a.into()])
    }

    /// # Errors
    pub fn from_value(value: &Value) -> Result<Self> {
        let members = value.members()?;
        Ok(Self {
            a: members[0].as_i32()?,
        })
    }
}

impl Profile {
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Record(vec![
            self.a.into(),
            self.b.as_str().into(),
            self.inner.to_value(),
        ])
    }

    /// # Errors
    pub fn from_value(value: &Value) -> Result<Self> {
        let members = value.members()?;
        Ok(Self {
            a: members[0].as_i32()?,
            b: members[1].as_str()?.to_string(),
            inner: Inner::from_value(&members[2])?,
        })
    }
}

impl Summary {
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Record(vec![
            self.c.as_str().into(),
            self.d.into(),
            self.inner.to_value(),
        ])
    }

    /// # Errors
    pub fn from_value(value: &Value) -> Result<Self> {
        let members = value.members()?;
        Ok(Self {
            c: members[0].as_str()?.to_string(),
            d: members[1].as_u64()?,
            inner: Inner::from_value(&members[2])?,
        })
    }
}

fn inner_ty() -> TypeDesc {
    TypeDesc::Record(vec![RecordField::new(
        "a",
        TypeDesc::Primitive(PrimitiveKind::I32),
    )])
}

fn profile_ty() -> TypeDesc {
    TypeDesc::Record(vec![
        RecordField::new("a", TypeDesc::Primitive(PrimitiveKind::I32)),
        RecordField::new("b", TypeDesc::Primitive(PrimitiveKind::Str)),
        RecordField::new("inner", inner_ty()),
    ])
}

fn summary_ty() -> TypeDesc {
    TypeDesc::Record(vec![
        RecordField::new("c", TypeDesc::Primitive(PrimitiveKind::Str)),
        RecordField::new("d", TypeDesc::Primitive(PrimitiveKind::U64)),
        RecordField::new("inner", inner_ty()),
    ])
}

fn bytes_ty() -> TypeDesc {
    TypeDesc::array(TypeDesc::Primitive(PrimitiveKind::U8))
}

/// The demo interface. Client and server binaries both build their schema
/// from this single declaration.
///
/// # Panics
///
/// The declaration is static; building it cannot fail.
#[must_use]
pub fn sample_schema() -> InterfaceSchema {
    use PrimitiveKind::*;

    SchemaBuilder::new("Sample")
        .method(
            "add",
            [
                ("x", TypeDesc::Primitive(I32)),
                ("y", TypeDesc::Primitive(I32)),
            ],
            Some(TypeDesc::Primitive(I32)),
        )
        .method("hi", [], None)
        .method(
            "fancy_hi",
            [
                ("name", TypeDesc::Primitive(Str)),
                ("age", TypeDesc::Primitive(I32)),
            ],
            None,
        )
        .method(
            "buffer_call",
            [("base", bytes_ty()), ("n", TypeDesc::Primitive(I32))],
            Some(bytes_ty()),
        )
        .method(
            "get_struct",
            [
                ("a", TypeDesc::Primitive(I32)),
                ("profile", profile_ty()),
                ("b", TypeDesc::Primitive(F64)),
            ],
            Some(summary_ty()),
        )
        .method(
            "get_value_tuple",
            [("s", TypeDesc::Primitive(Str))],
            Some(TypeDesc::Tuple(vec![
                TypeDesc::Primitive(I32),
                TypeDesc::Primitive(I32),
                TypeDesc::Primitive(I16),
                bytes_ty(),
            ])),
        )
        .method(
            "get_tuple_array",
            [],
            Some(TypeDesc::array(TypeDesc::Tuple(vec![
                TypeDesc::Primitive(U32),
                TypeDesc::Primitive(I64),
                TypeDesc::Primitive(F64),
            ]))),
        )
        .method(
            "next_shade",
            [("input", TypeDesc::Enum(U8))],
            Some(TypeDesc::Enum(U8)),
        )
        .method(
            "get_nullable",
            [("val", TypeDesc::nullable(TypeDesc::Primitive(F32)))],
            Some(TypeDesc::nullable(TypeDesc::Primitive(F64))),
        )
        .method("get_fast_string", [], Some(TypeDesc::Primitive(Str)))
        .method("get_slow_string", [], Some(TypeDesc::Primitive(Str)))
        .event(
            "on_data",
            [
                ("value", TypeDesc::Primitive(F64)),
                ("tag", TypeDesc::Primitive(Str)),
            ],
        )
        .build()
        .expect("static schema declaration")
}

fn missing_return() -> Error {
    Error::new(
        ErrorKind::DecodeFailed,
        "void response for a non-void method".to_string(),
    )
}

/// Typed client stub over the generic [`Client`].
pub struct SampleApi {
    client: Client,
}

impl SampleApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn healthy(&self) -> bool {
        self.client.healthy()
    }

    /// # Errors
    pub async fn add(&self, x: i32, y: i32) -> Result<i32> {
        let result = self.client.call("add", vec![x.into(), y.into()]).await?;
        result.ok_or_else(missing_return)?.as_i32()
    }

    /// # Errors
    pub async fn hi(&self) -> Result<()> {
        self.client.call("hi", vec![]).await?;
        Ok(())
    }

    /// # Errors
    pub async fn fancy_hi(&self, name: &str, age: i32) -> Result<()> {
        self.client
            .call("fancy_hi", vec![name.into(), age.into()])
            .await?;
        Ok(())
    }

    /// # Errors
    pub async fn buffer_call(&self, base: Vec<u8>, n: i32) -> Result<Vec<u8>> {
        let result = self
            .client
            .call("buffer_call", vec![base.into(), n.into()])
            .await?;
        result.ok_or_else(missing_return)?.into_bytes()
    }

    /// # Errors
    pub async fn get_struct(&self, a: i32, profile: &Profile, b: f64) -> Result<Summary> {
        let result = self
            .client
            .call("get_struct", vec![a.into(), profile.to_value(), b.into()])
            .await?;
        Summary::from_value(&result.ok_or_else(missing_return)?)
    }

    /// # Errors
    pub async fn get_value_tuple(&self, s: &str) -> Result<(i32, i32, i16, Vec<u8>)> {
        let result = self.client.call("get_value_tuple", vec![s.into()]).await?;
        let value = result.ok_or_else(missing_return)?;
        let members = value.members()?;
        Ok((
            members[0].as_i32()?,
            members[1].as_i32()?,
            members[2].as_i16()?,
            members[3].as_bytes()?.to_vec(),
        ))
    }

    /// # Errors
    pub async fn get_tuple_array(&self) -> Result<Vec<(u32, i64, f64)>> {
        let result = self.client.call("get_tuple_array", vec![]).await?;
        let value = result.ok_or_else(missing_return)?;
        let mut rows = Vec::new();
        for row in value.members()? {
            let members = row.members()?;
            rows.push((
                members[0].as_u32()?,
                members[1].as_i64()?,
                members[2].as_f64()?,
            ));
        }
        Ok(rows)
    }

    /// # Errors
    pub async fn next_shade(&self, input: Shade) -> Result<Shade> {
        let result = self
            .client
            .call("next_shade", vec![input.to_value()])
            .await?;
        Shade::from_value(&result.ok_or_else(missing_return)?)
    }

    /// # Errors
    pub async fn get_nullable(&self, val: Option<f32>) -> Result<Option<f64>> {
        let arg = match val {
            Some(v) => Value::some(v.into()),
            None => Value::none(),
        };
        let result = self.client.call("get_nullable", vec![arg]).await?;
        let value = result.ok_or_else(missing_return)?;
        match value.as_nullable()? {
            Some(inner) => Ok(Some(inner.as_f64()?)),
            None => Ok(None),
        }
    }

    /// # Errors
    pub async fn get_fast_string(&self) -> Result<String> {
        let result = self.client.call("get_fast_string", vec![]).await?;
        result.ok_or_else(missing_return)?.into_str()
    }

    /// # Errors
    pub async fn get_slow_string(&self) -> Result<String> {
        let result = self.client.call("get_slow_string", vec![]).await?;
        result.ok_or_else(missing_return)?.into_str()
    }

    /// Subscribes to the `on_data` event.
    ///
    /// # Errors
    pub fn on_data<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(f64, &str) + Send + Sync + 'static,
    {
        self.client.subscribe("on_data", move |args| {
            if let (Ok(value), Ok(tag)) = (args[0].as_f64(), args[1].as_str()) {
                callback(value, tag);
            }
        })
    }
}

/// Server-side push helper for the `on_data` event.
///
/// # Errors
pub async fn fire_on_data(handle: &ServerHandle, value: f64, tag: &str) -> Result<()> {
    handle
        .fire_event("on_data", vec![value.into(), tag.into()])
        .await
}
