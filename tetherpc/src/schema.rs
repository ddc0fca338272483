use foldhash::fast::RandomState;
use std::collections::HashMap;

use crate::{
    codec::{CodecId, CodecRegistry},
    error::{Error, ErrorKind, Result},
};

/// Fixed-width primitive wire types.
///
/// All multi-byte primitives travel little-endian. Strings are a u32
/// byte-count prefix followed by UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
}

impl PrimitiveKind {
    pub(crate) fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::U8
                | PrimitiveKind::I8
                | PrimitiveKind::U16
                | PrimitiveKind::I16
                | PrimitiveKind::U32
                | PrimitiveKind::I32
                | PrimitiveKind::U64
                | PrimitiveKind::I64
        )
    }
}

/// A named field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordField {
    pub name: String,
    pub ty: TypeDesc,
}

impl RecordField {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Structural description of a parameter, return or field type.
///
/// Declared by the interface author when building the schema; interned into
/// the [`CodecRegistry`] which assigns every distinct shape a [`CodecId`].
/// Two structurally identical descriptions share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Primitive(PrimitiveKind),
    Tuple(Vec<TypeDesc>),
    Array(Box<TypeDesc>),
    Nullable(Box<TypeDesc>),
    /// An enumeration carried as its underlying integer kind.
    Enum(PrimitiveKind),
    Record(Vec<RecordField>),
}

impl TypeDesc {
    pub fn array(element: TypeDesc) -> Self {
        TypeDesc::Array(Box::new(element))
    }

    pub fn nullable(inner: TypeDesc) -> Self {
        TypeDesc::Nullable(Box::new(inner))
    }
}

/// A named, typed parameter of a method or event.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: CodecId,
}

/// Immutable description of one interface method.
///
/// The `index` is the ordinal that travels on the wire in place of the name;
/// it is assigned by sorting methods by name, then arity.
#[derive(Debug, Clone)]
pub struct MethodDesc {
    pub name: String,
    pub index: u8,
    pub params: Vec<Param>,
    pub ret: Option<CodecId>,
}

/// Immutable description of one interface event (server to client only).
///
/// Event ordinals live in their own numbering space, independent of methods.
#[derive(Debug, Clone)]
pub struct EventDesc {
    pub name: String,
    pub index: u8,
    pub params: Vec<Param>,
}

/// The complete, immutable interface description a client/server pair is
/// built from: method and event descriptors plus the codec registry holding
/// every reachable type.
pub struct InterfaceSchema {
    name: String,
    methods: Vec<MethodDesc>,
    events: Vec<EventDesc>,
    registry: CodecRegistry,
    method_names: HashMap<String, u8, RandomState>,
    event_names: HashMap<String, u8, RandomState>,
}

impl InterfaceSchema {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn methods(&self) -> &[MethodDesc] {
        &self.methods
    }

    #[must_use]
    pub fn events(&self) -> &[EventDesc] {
        &self.events
    }

    #[must_use]
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// # Errors
    pub fn method(&self, name: &str) -> Result<&MethodDesc> {
        self.method_names
            .get(name)
            .map(|idx| &self.methods[*idx as usize])
            .ok_or_else(|| Error::new(ErrorKind::UnknownMethod, name.to_string()))
    }

    #[must_use]
    pub fn method_by_index(&self, index: u8) -> Option<&MethodDesc> {
        self.methods.get(index as usize)
    }

    /// # Errors
    pub fn event(&self, name: &str) -> Result<&EventDesc> {
        self.event_names
            .get(name)
            .map(|idx| &self.events[*idx as usize])
            .ok_or_else(|| Error::new(ErrorKind::UnknownEvent, name.to_string()))
    }

    #[must_use]
    pub fn event_by_index(&self, index: u8) -> Option<&EventDesc> {
        self.events.get(index as usize)
    }
}

impl std::fmt::Debug for InterfaceSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceSchema")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .field("events", &self.events.len())
            .field("types", &self.registry.len())
            .finish()
    }
}

struct RawSignature {
    name: String,
    params: Vec<(String, TypeDesc)>,
    ret: Option<TypeDesc>,
}

/// Builder assembling an [`InterfaceSchema`] from declared signatures.
///
/// Declaration order does not matter: `build` sorts methods and events by
/// (name, arity) before assigning ordinals, so both sides of a connection
/// derive identical descriptors from the same declarations.
pub struct SchemaBuilder {
    name: String,
    methods: Vec<RawSignature>,
    events: Vec<RawSignature>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = (&'static str, TypeDesc)>,
        ret: Option<TypeDesc>,
    ) -> Self {
        self.methods.push(RawSignature {
            name: name.into(),
            params: params
                .into_iter()
                .map(|(n, ty)| (n.to_string(), ty))
                .collect(),
            ret,
        });
        self
    }

    #[must_use]
    pub fn event(
        mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = (&'static str, TypeDesc)>,
    ) -> Self {
        self.events.push(RawSignature {
            name: name.into(),
            params: params
                .into_iter()
                .map(|(n, ty)| (n.to_string(), ty))
                .collect(),
            ret: None,
        });
        self
    }

    /// Assigns ordinals, discovers every reachable type and produces the
    /// immutable schema.
    ///
    /// # Errors
    ///
    /// Fails on duplicate method/event names, more than 256 methods or
    /// events (ordinals are a single byte on the wire), or an enum declared
    /// over a non-integer kind.
    pub fn build(self) -> Result<InterfaceSchema> {
        let methods = Self::sort_and_index(self.methods, "method")?;
        let events = Self::sort_and_index(self.events, "event")?;

        // Seed the registry worklist with every parameter and return type,
        // in descriptor order.
        let mut seeds = Vec::new();
        for sig in methods.iter().chain(events.iter()) {
            seeds.extend(sig.params.iter().map(|(_, ty)| ty));
            seeds.extend(sig.ret.iter());
        }
        let registry = CodecRegistry::discover(seeds)?;

        let mut method_names = HashMap::default();
        let mut method_descs = Vec::with_capacity(methods.len());
        for (index, sig) in methods.iter().enumerate() {
            method_names.insert(sig.name.clone(), index as u8);
            let (params, ret) = Self::resolve(&registry, sig)?;
            method_descs.push(MethodDesc {
                name: sig.name.clone(),
                index: index as u8,
                params,
                ret,
            });
        }

        let mut event_names = HashMap::default();
        let mut event_descs = Vec::with_capacity(events.len());
        for (index, sig) in events.iter().enumerate() {
            event_names.insert(sig.name.clone(), index as u8);
            let (params, _) = Self::resolve(&registry, sig)?;
            event_descs.push(EventDesc {
                name: sig.name.clone(),
                index: index as u8,
                params,
            });
        }
        let (methods, events) = (method_descs, event_descs);

        Ok(InterfaceSchema {
            name: self.name,
            methods,
            events,
            registry,
            method_names,
            event_names,
        })
    }

    fn resolve(
        registry: &CodecRegistry,
        sig: &RawSignature,
    ) -> Result<(Vec<Param>, Option<CodecId>)> {
        let mut params = Vec::with_capacity(sig.params.len());
        for (name, ty) in &sig.params {
            params.push(Param {
                name: name.clone(),
                ty: registry.require(ty)?,
            });
        }
        let ret = match &sig.ret {
            Some(ty) => Some(registry.require(ty)?),
            None => None,
        };
        Ok((params, ret))
    }

    fn sort_and_index(mut sigs: Vec<RawSignature>, what: &str) -> Result<Vec<RawSignature>> {
        sigs.sort_by(|a, b| {
            (a.name.as_str(), a.params.len()).cmp(&(b.name.as_str(), b.params.len()))
        });
        if sigs.len() > u8::MAX as usize + 1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("too many {what}s: {} (ordinal is one byte)", sigs.len()),
            ));
        }
        for pair in sigs.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("duplicate {what} name: {}", pair[0].name),
                ));
            }
        }
        Ok(sigs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaBuilder {
        SchemaBuilder::new("Sample")
            .method(
                "add",
                [
                    ("x", TypeDesc::Primitive(PrimitiveKind::I32)),
                    ("y", TypeDesc::Primitive(PrimitiveKind::I32)),
                ],
                Some(TypeDesc::Primitive(PrimitiveKind::I32)),
            )
            .method("hi", [], None)
            .method(
                "buffer_call",
                [
                    (
                        "base",
                        TypeDesc::array(TypeDesc::Primitive(PrimitiveKind::U8)),
                    ),
                    ("n", TypeDesc::Primitive(PrimitiveKind::I32)),
                ],
                Some(TypeDesc::array(TypeDesc::Primitive(PrimitiveKind::U8))),
            )
            .event(
                "on_data",
                [
                    ("value", TypeDesc::Primitive(PrimitiveKind::F64)),
                    ("tag", TypeDesc::Primitive(PrimitiveKind::Str)),
                ],
            )
    }

    #[test]
    fn test_ordinals_sorted_by_name() {
        let schema = sample().build().unwrap();
        let names: Vec<_> = schema.methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["add", "buffer_call", "hi"]);
        assert_eq!(schema.method("hi").unwrap().index, 2);
        assert_eq!(schema.event("on_data").unwrap().index, 0);
        assert!(schema.method("nope").is_err());
    }

    #[test]
    fn test_deterministic_across_builds() {
        let a = sample().build().unwrap();
        let b = sample().build().unwrap();
        for (ma, mb) in a.methods().iter().zip(b.methods()) {
            assert_eq!(ma.name, mb.name);
            assert_eq!(ma.index, mb.index);
            assert_eq!(ma.ret, mb.ret);
            for (pa, pb) in ma.params.iter().zip(&mb.params) {
                assert_eq!(pa.ty, pb.ty);
            }
        }
        assert_eq!(a.registry().len(), b.registry().len());
    }

    #[test]
    fn test_identical_shapes_share_identity() {
        let schema = sample().build().unwrap();
        let bytes = TypeDesc::array(TypeDesc::Primitive(PrimitiveKind::U8));
        let m = schema.method("buffer_call").unwrap();
        assert_eq!(schema.registry().id_of(&bytes), Some(m.params[0].ty));
        assert_eq!(m.ret, Some(m.params[0].ty));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = SchemaBuilder::new("Dup")
            .method("a", [], None)
            .method("a", [("x", TypeDesc::Primitive(PrimitiveKind::Bool))], None)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_must_be_integer() {
        let result = SchemaBuilder::new("BadEnum")
            .method(
                "f",
                [("e", TypeDesc::Enum(PrimitiveKind::F64))],
                None,
            )
            .build();
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidArgument);
    }
}
