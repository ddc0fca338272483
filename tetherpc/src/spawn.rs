use std::path::Path;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};

use crate::{
    error::{Error, ErrorKind, Result},
    stream::RawStream,
};

/// Binds the listener the spawned server process dials back to.
pub(crate) async fn bind(loopback_only: bool) -> Result<TcpListener> {
    let host = if loopback_only { "127.0.0.1" } else { "0.0.0.0" };
    TcpListener::bind((host, 0))
        .await
        .map_err(|e| Error::new(ErrorKind::BindFailed, e.to_string()))
}

pub(crate) fn listener_port(listener: &TcpListener) -> Result<u16> {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| Error::new(ErrorKind::BindFailed, e.to_string()))
}

/// Spawns the paired server executable with the transport argv
/// `[address-or-pipe, port]`, working directory set to the executable's
/// parent directory.
pub(crate) fn spawn_server(exe: &Path, transport_arg: &str, port_arg: &str) -> Result<Child> {
    let exe = exe
        .canonicalize()
        .map_err(|e| Error::new(ErrorKind::SpawnFailed, format!("{}: {e}", exe.display())))?;
    let mut command = Command::new(&exe);
    command.arg(transport_arg).arg(port_arg);
    if let Some(dir) = exe.parent() {
        command.current_dir(dir);
    }
    command
        .spawn()
        .map_err(|e| Error::new(ErrorKind::SpawnFailed, format!("{}: {e}", exe.display())))
}

/// Accepts the single inbound connection from the spawned process.
pub(crate) async fn accept_one(listener: &TcpListener) -> Result<RawStream> {
    let (stream, addr) = listener
        .accept()
        .await
        .map_err(|e| Error::new(ErrorKind::AcceptFailed, e.to_string()))?;
    tracing::info!("accepted server connection from {addr}");
    Ok(stream.into())
}

/// Server-side dial-back from the spawn argv: a Unix socket path when the
/// first argument is a path, `host:port` TCP otherwise.
pub(crate) async fn dial(args: &[String]) -> Result<RawStream> {
    let (first, second) = match args {
        [first, second, ..] => (first, second),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "expected argv: <address-or-pipe> <port>".to_string(),
            ));
        }
    };

    #[cfg(unix)]
    if first.contains('/') {
        let stream = tokio::net::UnixStream::connect(first)
            .await
            .map_err(|e| Error::new(ErrorKind::ConnectFailed, format!("{first}: {e}")))?;
        return Ok(stream.into());
    }

    let port: u16 = second
        .parse()
        .map_err(|_| Error::new(ErrorKind::InvalidArgument, format!("invalid port: {second}")))?;
    let stream = TcpStream::connect((first.as_str(), port))
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectFailed, format!("{first}:{port}: {e}")))?;
    Ok(stream.into())
}

#[cfg(unix)]
pub(crate) mod pipe {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::net::UnixListener;

    use crate::{
        error::{Error, ErrorKind, Result},
        stream::RawStream,
    };

    static PIPE_SEQ: AtomicU64 = AtomicU64::new(0);

    /// A fresh socket path under the system temp directory.
    pub(crate) fn fresh_path() -> PathBuf {
        let seq = PIPE_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("tetherpc-{}-{seq}.sock", std::process::id()))
    }

    pub(crate) fn bind(path: &PathBuf) -> Result<UnixListener> {
        UnixListener::bind(path)
            .map_err(|e| Error::new(ErrorKind::BindFailed, format!("{}: {e}", path.display())))
    }

    pub(crate) async fn accept_one(listener: &UnixListener, path: &PathBuf) -> Result<RawStream> {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::new(ErrorKind::AcceptFailed, e.to_string()))?;
        // connection is up, the filesystem entry has served its purpose
        let _ = std::fs::remove_file(path);
        tracing::info!("accepted server connection on {}", path.display());
        Ok(stream.into())
    }
}
