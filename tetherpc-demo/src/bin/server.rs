use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use tetherpc::{Error, ErrorKind, Router, Server, Value};
use tetherpc_demo::{Inner, Profile, Shade, Summary, fire_on_data, sample_schema};

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Transport address or pipe path handed down by the spawning client.
    pub address: String,

    /// Listener port (ignored for pipe transport).
    pub port: String,
}

fn router() -> Router {
    let mut router = Router::default();

    router.add_method("add", |args: Vec<Value>| async move {
        let sum = args[0].as_i32()?.wrapping_add(args[1].as_i32()?);
        Ok(Some(sum.into()))
    });

    router.add_method("hi", |_args: Vec<Value>| async move {
        tracing::info!("hi");
        Ok(None)
    });

    router.add_method("fancy_hi", |args: Vec<Value>| async move {
        tracing::info!("fancy hi, {} years old {}!", args[1].as_i32()?, args[0].as_str()?);
        Ok(None)
    });

    router.add_method("buffer_call", |args: Vec<Value>| async move {
        let base = String::from_utf8_lossy(args[0].as_bytes()?).into_owned();
        let n = args[1].as_i32()?;
        Ok(Some(format!("{base} x{n}").into_bytes().into()))
    });

    router.add_method("get_struct", |args: Vec<Value>| async move {
        let a = args[0].as_i32()?;
        let profile = Profile::from_value(&args[1])?;
        let b = args[2].as_f64()?;
        let summary = Summary {
            c: format!(
                "a={a} p.a={} p.b={} p.inner.a={} b={b}",
                profile.a, profile.b, profile.inner.a
            ),
            d: 514_546,
            inner: Inner { a: 123 },
        };
        Ok(Some(summary.to_value()))
    });

    router.add_method("get_value_tuple", |args: Vec<Value>| async move {
        let text = args[0].as_str()?.to_string();
        let mut parts = text.splitn(4, ' ');
        let mut next_int = || -> Result<i64, Error> {
            parts
                .next()
                .and_then(|part| part.parse().ok())
                .ok_or_else(|| {
                    Error::new(ErrorKind::InvalidArgument, format!("unparsable input: {text:?}"))
                })
        };
        let a = next_int()? as i32;
        let b = next_int()? as i32;
        let c = next_int()? as i16;
        let rest = parts.next().unwrap_or_default().as_bytes().to_vec();
        Ok(Some(Value::Tuple(vec![
            a.into(),
            b.into(),
            c.into(),
            rest.into(),
        ])))
    });

    router.add_method("get_tuple_array", |_args: Vec<Value>| async move {
        let rows = [
            (1u32, 15i64, 35.0f64),
            (u32::MAX, i64::MAX, f64::MIN),
            (u32::MIN, i64::MIN, f64::MAX),
        ];
        let rows = rows
            .iter()
            .map(|(a, b, c)| Value::Tuple(vec![(*a).into(), (*b).into(), (*c).into()]))
            .collect();
        Ok(Some(Value::Array(rows)))
    });

    router.add_method("next_shade", |args: Vec<Value>| async move {
        let next = match Shade::from_value(&args[0])? {
            Shade::Red => Shade::Green,
            Shade::Green => Shade::Blue,
            Shade::Blue => Shade::Ultra,
            Shade::Ultra => Shade::Red,
        };
        Ok(Some(next.to_value()))
    });

    router.add_method("get_nullable", |args: Vec<Value>| async move {
        let result = match args[0].as_nullable()? {
            Some(value) => Value::some((f64::from(value.as_f32()?) + 50.0).into()),
            None => Value::none(),
        };
        Ok(Some(result))
    });

    router.add_method("get_fast_string", |_args: Vec<Value>| async move {
        Ok(Some("fast string".into()))
    });

    router.add_method("get_slow_string", |_args: Vec<Value>| async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(Some("slow string".into()))
    });

    router
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let schema = Arc::new(sample_schema());
    let server = Server::create(schema, router()).unwrap();
    let conn = server
        .connect(&[args.address.clone(), args.port.clone()])
        .await
        .unwrap();
    tracing::info!("serving on {}:{}", args.address, args.port);

    // push a data point every 100ms for as long as the connection lives
    let handle = conn.handle();
    tokio::spawn(async move {
        let mut n = 0u64;
        while handle.healthy() {
            let value = (n as f64) / 8.0;
            if fire_on_data(&handle, value, &format!("marf - {n}")).await.is_err() {
                break;
            }
            n += 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    });

    conn.join().await;
    tracing::info!("connection closed, exiting");
}
