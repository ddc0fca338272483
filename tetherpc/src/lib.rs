#![forbid(unsafe_code)]

//! Duplex-stream RPC: a type-directed binary codec, id-correlated call
//! multiplexing with server-pushed events, and connection bootstrap via a
//! local subprocess or an SSH-launched remote one.
//!
//! Client and server are driven by an [`InterfaceSchema`] built at startup;
//! both sides must build it from the same declarations — there is no
//! negotiation and no versioning on the wire.

mod error;
pub use error::{Error, ErrorKind, Result};

mod value;
pub use value::Value;

mod schema;
pub use schema::{
    EventDesc, InterfaceSchema, MethodDesc, Param, PrimitiveKind, RecordField, SchemaBuilder,
    TypeDesc,
};

mod codec;
pub use codec::{CodecId, CodecRegistry};

mod wire;

mod stream;
pub use stream::RawStream;

mod health;
pub use health::Health;

mod waiter;

mod router;
pub use router::{Method, Router};

mod config;
pub use config::{ClientConfig, SshConfig};

mod spawn;
mod ssh;

mod client;
pub use client::{Client, EventCallback};

mod server;
pub use server::{ReplyHandle, Server, ServerConn, ServerHandle};
