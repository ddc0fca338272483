use foldhash::fast::RandomState;
use std::collections::HashMap;
use std::future::Future;

use crate::{
    error::{Error, ErrorKind, Result},
    server::ReplyHandle,
    value::Value,
};

pub type Method = Box<dyn Fn(ReplyHandle, Vec<Value>) + Send + Sync>;

/// Server-side method table.
///
/// A registered handler is invoked once per decoded call frame; it runs in
/// its own task, so handlers may complete out of order relative to arrival.
/// The reply is written when the handler finishes, tagged with the original
/// request id.
#[derive(Default)]
pub struct Router {
    methods: HashMap<String, Method, RandomState>,
}

impl Router {
    /// Registers the handler for one interface method.
    ///
    /// The handler returns `Ok(Some(value))` for a declared return type,
    /// `Ok(None)` for void methods, or `Err` — which travels back to the
    /// caller as an error response rather than touching the connection.
    pub fn add_method<F, Fut>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.methods.insert(
            name.into(),
            Box::new(move |reply, args| {
                let fut = func(args);
                tokio::spawn(async move {
                    reply.send(fut.await).await;
                });
            }),
        );
    }

    pub fn method_names(&self) -> impl Iterator<Item = &String> {
        self.methods.keys()
    }

    #[must_use]
    pub fn covers(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub(crate) fn dispatch(&self, reply: ReplyHandle, name: &str, args: Vec<Value>) {
        if let Some(func) = self.methods.get(name) {
            func(reply, args);
        } else {
            let msg = format!("method not routed: {name}");
            tracing::error!(msg);
            tokio::spawn(async move {
                reply.send(Err(Error::new(ErrorKind::UnknownMethod, msg))).await;
            });
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.methods.keys())
            .finish()
    }
}
