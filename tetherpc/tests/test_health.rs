use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use tetherpc::{
    Client, ClientConfig, ErrorKind, InterfaceSchema, PrimitiveKind, Router, SchemaBuilder,
    Server, TypeDesc, Value,
};

fn schema() -> Arc<InterfaceSchema> {
    Arc::new(
        SchemaBuilder::new("HealthTest")
            .method("ping", [], Some(TypeDesc::Primitive(PrimitiveKind::I32)))
            .method(
                "echo",
                [("text", TypeDesc::Primitive(PrimitiveKind::Str))],
                Some(TypeDesc::Primitive(PrimitiveKind::Str)),
            )
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_transport_failure_fails_pending_and_later_calls() {
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    // no server behind the other end; the call below stays pending
    let client = Arc::new(Client::attach(schema, ClientConfig::default(), client_io));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.call("ping", vec![]).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.healthy());

    drop(server_io);

    // the pending call resolves with a failure instead of hanging
    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionBroken);
    assert!(!client.healthy());

    // calls issued afterwards fail immediately
    let err = client.call("ping", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionBroken);

    // the flag never resets
    assert!(!client.healthy());
    client.health().unhealthy().await;
}

#[tokio::test]
async fn test_unhealthy_observer_fires() {
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    let client = Client::attach(schema, ClientConfig::default(), client_io);

    let health = client.health();
    let observer = tokio::spawn(async move {
        health.unhealthy().await;
    });

    drop(server_io);
    observer.await.unwrap();
    assert!(!client.healthy());
}

#[tokio::test]
async fn test_late_response_after_timeout_is_discarded() {
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);

    let release = Arc::new(Notify::new());
    let mut router = Router::default();
    {
        let release = release.clone();
        router.add_method("ping", move |_args: Vec<Value>| {
            let release = release.clone();
            async move {
                release.notified().await;
                Ok(Some(Value::I32(1)))
            }
        });
    }
    router.add_method("echo", |args: Vec<Value>| async move {
        Ok(Some(Value::from(args[0].as_str()?.to_string())))
    });
    let _conn = Server::create(schema.clone(), router).unwrap().attach(server_io);

    let config: ClientConfig =
        serde_json::from_str(r#"{"call_timeout": "100ms"}"#).unwrap();
    let client = Client::attach(schema, config, client_io);

    let err = client.call("ping", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);

    // the response arrives after the caller gave up; the read loop consumes
    // it with the retained table entry and the stream stays usable
    release.notify_one();
    let result = client.call("echo", vec![Value::from("still here")]).await.unwrap();
    assert_eq!(result, Some(Value::from("still here")));
    assert!(client.healthy());
}
