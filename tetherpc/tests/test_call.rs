use std::sync::{Arc, Mutex};

use tetherpc::{
    Client, ClientConfig, Error, ErrorKind, InterfaceSchema, PrimitiveKind, Router, SchemaBuilder,
    Server, ServerConn, TypeDesc, Value,
};

fn schema() -> Arc<InterfaceSchema> {
    Arc::new(
        SchemaBuilder::new("CallTest")
            .method(
                "echo",
                [("text", TypeDesc::Primitive(PrimitiveKind::Str))],
                Some(TypeDesc::Primitive(PrimitiveKind::Str)),
            )
            .method(
                "delay",
                [("ms", TypeDesc::Primitive(PrimitiveKind::U64))],
                Some(TypeDesc::Primitive(PrimitiveKind::U64)),
            )
            .method("hi", [], None)
            .method("fail", [], Some(TypeDesc::Primitive(PrimitiveKind::I32)))
            .build()
            .unwrap(),
    )
}

fn router() -> Router {
    let mut router = Router::default();
    router.add_method("echo", |args: Vec<Value>| async move {
        Ok(Some(Value::from(args[0].as_str()?.to_string())))
    });
    router.add_method("delay", |args: Vec<Value>| async move {
        let ms = args[0].as_u64()?;
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        Ok(Some(Value::from(ms)))
    });
    router.add_method("hi", |_args: Vec<Value>| async move { Ok(None) });
    router.add_method("fail", |_args: Vec<Value>| async move {
        Err(Error::new(ErrorKind::InvalidArgument, "no can do".into()))
    });
    router
}

fn pair() -> (Arc<Client>, ServerConn) {
    let _ = tracing_subscriber::fmt().try_init();
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    let conn = Server::create(schema.clone(), router()).unwrap().attach(server_io);
    let client = Arc::new(Client::attach(schema, ClientConfig::default(), client_io));
    (client, conn)
}

#[tokio::test]
async fn test_echo() {
    let (client, _conn) = pair();
    let result = client
        .call("echo", vec![Value::from("tether")])
        .await
        .unwrap();
    assert_eq!(result, Some(Value::from("tether")));
    assert!(client.healthy());
}

#[tokio::test]
async fn test_void_call_completes() {
    let (client, _conn) = pair();
    assert_eq!(client.call("hi", vec![]).await.unwrap(), None);
}

#[tokio::test]
async fn test_handler_error_reaches_caller() {
    let (client, _conn) = pair();
    let err = client.call("fail", vec![]).await.unwrap_err();
    match err.kind {
        ErrorKind::Remote(msg) => assert!(msg.contains("no can do"), "{msg}"),
        other => panic!("expected Remote, got {other:?}"),
    }
    // a handler failure is scoped to its call, not the connection
    assert!(client.healthy());
    assert_eq!(client.call("hi", vec![]).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_method_rejected_locally() {
    let (client, _conn) = pair();
    let err = client.call("nope", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownMethod);
}

#[tokio::test]
async fn test_arity_mismatch_rejected_before_write() {
    let (client, _conn) = pair();
    let err = client.call("echo", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert!(client.healthy());
}

#[tokio::test]
async fn test_concurrent_calls_complete_out_of_order() {
    let (client, _conn) = pair();

    let completion_order = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for ms in [250u64, 200, 150, 100, 50] {
        let client = client.clone();
        let completion_order = completion_order.clone();
        tasks.push(tokio::spawn(async move {
            let result = client.call("delay", vec![Value::from(ms)]).await.unwrap();
            // every caller receives its own echoed input...
            assert_eq!(result, Some(Value::U64(ms)));
            completion_order.lock().unwrap().push(ms);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // ...even though responses arrived in reverse of the request order
    let order = completion_order.lock().unwrap().clone();
    assert_eq!(order, vec![50, 100, 150, 200, 250]);
}
