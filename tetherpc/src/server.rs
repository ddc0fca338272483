use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::{
    codec::CodecId,
    error::{Error, ErrorKind, Result},
    health::Health,
    router::Router,
    schema::InterfaceSchema,
    spawn,
    stream::{RawStream, StreamReadHalf, StreamWriteHalf},
    value::Value,
    wire,
};

/// Server dispatcher: the schema plus a router covering every method.
///
/// Built once, then bound to a stream with [`connect`](Self::connect)
/// (dialing back per the spawn argv) or [`attach`](Self::attach).
pub struct Server {
    schema: Arc<InterfaceSchema>,
    router: Arc<Router>,
}

impl Server {
    /// # Errors
    ///
    /// Fails if any schema method has no routed handler.
    pub fn create(schema: Arc<InterfaceSchema>, router: Router) -> Result<Self> {
        for method in schema.methods() {
            if !router.covers(&method.name) {
                return Err(Error::new(
                    ErrorKind::UnknownMethod,
                    format!("no handler routed for {}", method.name),
                ));
            }
        }
        Ok(Self {
            schema,
            router: Arc::new(router),
        })
    }

    /// Dials back to the client per the spawn argv
    /// (`[address-or-pipe, port]`) and starts dispatching.
    ///
    /// # Errors
    pub async fn connect(self, args: &[String]) -> Result<ServerConn> {
        let stream = spawn::dial(args).await?;
        Ok(self.attach(stream))
    }

    /// Starts dispatching over an already-established stream. Must run
    /// inside a tokio runtime: the dispatch loop is spawned here.
    pub fn attach(self, stream: impl Into<RawStream>) -> ServerConn {
        let (reader, writer) = stream.into().split();
        let writer = Arc::new(Mutex::new(writer));
        let health = Health::new();
        let handle = ServerHandle {
            schema: self.schema.clone(),
            writer: writer.clone(),
            health: health.clone(),
        };
        let task = tokio::spawn(dispatch_loop(
            reader,
            self.schema,
            self.router,
            writer,
            health,
        ));
        ServerConn { handle, task }
    }
}

/// A served connection: lives until the stream breaks.
pub struct ServerConn {
    handle: ServerHandle,
    task: tokio::task::JoinHandle<()>,
}

impl ServerConn {
    #[must_use]
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn health(&self) -> Health {
        self.handle.health.clone()
    }

    #[must_use]
    pub fn healthy(&self) -> bool {
        self.handle.health.is_healthy()
    }

    /// Waits until the dispatch loop exits (the connection became
    /// unhealthy).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Cloneable handle for pushing events to the connected client.
#[derive(Clone)]
pub struct ServerHandle {
    schema: Arc<InterfaceSchema>,
    writer: Arc<Mutex<StreamWriteHalf>>,
    health: Health,
}

impl ServerHandle {
    /// Fires one event at the client. The frame shares the stream with call
    /// responses and is written as one unit under the write lock, so it can
    /// land between two responses but never inside one.
    ///
    /// # Errors
    pub async fn fire_event(&self, event: &str, args: Vec<Value>) -> Result<()> {
        let event = self.schema.event(event)?;
        if !self.health.is_healthy() {
            return Err(Error::kind(ErrorKind::ConnectionBroken));
        }
        let frame = wire::encode_event(self.schema.registry(), event, &args)?;

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;
        written.map_err(|e| {
            self.health.fail();
            Error::new(ErrorKind::SendFailed, e.to_string())
        })
    }

    #[must_use]
    pub fn health(&self) -> Health {
        self.health.clone()
    }

    #[must_use]
    pub fn healthy(&self) -> bool {
        self.health.is_healthy()
    }
}

/// Completion slot handed to a routed handler invocation: sends the data or
/// error response for one request id.
pub struct ReplyHandle {
    pub(crate) request_id: u32,
    pub(crate) ret: Option<CodecId>,
    pub(crate) schema: Arc<InterfaceSchema>,
    pub(crate) writer: Arc<Mutex<StreamWriteHalf>>,
    pub(crate) health: Health,
}

impl ReplyHandle {
    /// Writes the response frame for this request. Handler failures become
    /// error responses for this request id only; the connection stays up.
    pub async fn send(self, result: Result<Option<Value>>) {
        let registry = self.schema.registry();
        let encoded = match &result {
            Ok(value) => match (self.ret, value) {
                (Some(ty), Some(value)) => {
                    wire::encode_data_response(registry, self.request_id, Some((ty, value)))
                }
                (None, _) => wire::encode_data_response(registry, self.request_id, None),
                (Some(_), None) => Err(Error::new(
                    ErrorKind::EncodeFailed,
                    "handler returned no value for a non-void method".to_string(),
                )),
            },
            Err(e) => wire::encode_error_response(self.request_id, &e.to_string()),
        };
        let frame = match encoded {
            Ok(frame) => frame,
            // a handler result the codec rejects still gets an answer
            Err(e) => match wire::encode_error_response(self.request_id, &e.to_string()) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("cannot encode error response: {e}");
                    return;
                }
            },
        };

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            if self.health.fail() {
                tracing::error!("failed to write response: {e}");
            }
        }
    }
}

async fn dispatch_loop(
    mut reader: StreamReadHalf,
    schema: Arc<InterfaceSchema>,
    router: Arc<Router>,
    writer: Arc<Mutex<StreamWriteHalf>>,
    health: Health,
) {
    let error = loop {
        let call = tokio::select! {
            () = health.unhealthy() => break Error::kind(ErrorKind::ConnectionBroken),
            call = read_call(&mut reader, &schema) => call,
        };
        match call {
            Ok((name, ret, request_id, args)) => {
                let reply = ReplyHandle {
                    request_id,
                    ret,
                    schema: schema.clone(),
                    writer: writer.clone(),
                    health: health.clone(),
                };
                router.dispatch(reply, &name, args);
            }
            Err(e) => break e,
        }
    };

    if health.fail() {
        tracing::error!("server dispatch loop exiting: {error}");
    }
}

async fn read_call(
    reader: &mut StreamReadHalf,
    schema: &InterfaceSchema,
) -> Result<(String, Option<CodecId>, u32, Vec<Value>)> {
    let index = reader
        .read_u8()
        .await
        .map_err(|e| Error::new(ErrorKind::RecvFailed, e.to_string()))?;
    let request_id = wire::read_request_id(reader).await?;

    // arguments of an unknown method cannot be skipped, so this is fatal
    let Some(method) = schema.method_by_index(index) else {
        return Err(Error::new(
            ErrorKind::DecodeFailed,
            format!("unknown method index: {index}"),
        ));
    };

    let mut args = Vec::with_capacity(method.params.len());
    for param in &method.params {
        args.push(schema.registry().decode(reader, param.ty).await?);
    }
    Ok((method.name.clone(), method.ret, request_id, args))
}
