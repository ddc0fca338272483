use std::sync::Arc;

use tokio::sync::Notify;

use tetherpc::{
    Client, ClientConfig, InterfaceSchema, PrimitiveKind, Router, SchemaBuilder, Server, TypeDesc,
    Value,
};

fn schema() -> Arc<InterfaceSchema> {
    Arc::new(
        SchemaBuilder::new("EventTest")
            .method("slow", [], Some(TypeDesc::Primitive(PrimitiveKind::I32)))
            .method("nudge", [], None)
            .event(
                "tick",
                [
                    ("n", TypeDesc::Primitive(PrimitiveKind::I32)),
                    ("tag", TypeDesc::Primitive(PrimitiveKind::Str)),
                ],
            )
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_event_between_two_responses() {
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut router = Router::default();
    {
        let entered = entered.clone();
        let release = release.clone();
        router.add_method("slow", move |_args: Vec<Value>| {
            let entered = entered.clone();
            let release = release.clone();
            async move {
                entered.notify_one();
                release.notified().await;
                Ok(Some(Value::I32(1)))
            }
        });
    }
    router.add_method("nudge", |_args: Vec<Value>| async move { Ok(None) });

    let conn = Server::create(schema.clone(), router).unwrap().attach(server_io);
    let client = Arc::new(Client::attach(schema, ClientConfig::default(), client_io));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    client
        .subscribe("tick", move |args| {
            let _ = tx.send(args.to_vec());
        })
        .unwrap();

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.call("slow", vec![]).await })
    };

    // with the first call held open on the server, push an event onto the
    // shared stream, then let the call respond
    entered.notified().await;
    conn.handle()
        .fire_event("tick", vec![Value::I32(7), Value::from("mid")])
        .await
        .unwrap();
    release.notify_one();

    assert_eq!(slow.await.unwrap().unwrap(), Some(Value::I32(1)));
    assert_eq!(client.call("nudge", vec![]).await.unwrap(), None);

    let event = rx.recv().await.unwrap();
    assert_eq!(event, vec![Value::I32(7), Value::from("mid")]);
    assert!(client.healthy());
}

#[tokio::test]
async fn test_subscribers_run_in_registration_order() {
    let schema = schema();
    let (client_io, server_io) = tokio::io::duplex(1 << 16);

    let mut router = Router::default();
    router.add_method("slow", |_args: Vec<Value>| async move { Ok(Some(Value::I32(0))) });
    router.add_method("nudge", |_args: Vec<Value>| async move { Ok(None) });
    let conn = Server::create(schema.clone(), router).unwrap().attach(server_io);
    let client = Client::attach(schema, ClientConfig::default(), client_io);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for label in ["first", "second"] {
        let tx = tx.clone();
        client
            .subscribe("tick", move |args| {
                let _ = tx.send((label, args[0].as_i32().unwrap()));
            })
            .unwrap();
    }

    conn.handle()
        .fire_event("tick", vec![Value::I32(3), Value::from("x")])
        .await
        .unwrap();
    // a call after the event proves the frame was fully consumed
    assert_eq!(client.call("nudge", vec![]).await.unwrap(), None);

    assert_eq!(rx.recv().await.unwrap(), ("first", 3));
    assert_eq!(rx.recv().await.unwrap(), ("second", 3));
}

#[tokio::test]
async fn test_unknown_event_fire_rejected() {
    let schema = schema();
    let (_client_io, server_io) = tokio::io::duplex(1 << 16);
    let mut router = Router::default();
    router.add_method("slow", |_args: Vec<Value>| async move { Ok(Some(Value::I32(0))) });
    router.add_method("nudge", |_args: Vec<Value>| async move { Ok(None) });
    let conn = Server::create(schema, router).unwrap().attach(server_io);

    let err = conn
        .handle()
        .fire_event("boom", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.kind, tetherpc::ErrorKind::UnknownEvent);
}
