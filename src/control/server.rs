use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::app::Result;
use crate::store::Store;

use super::dispatch;

/// One-command-per-connection listener on a Unix domain socket.
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlServer {
    /// Bind the control socket, clearing any stale file left behind by a
    /// previous run. A bind failure is fatal to aggregator startup.
    pub fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Accept connections until `shutdown` fires, handling each on its own
    /// task. Removes the socket file on exit.
    pub async fn serve<S: Store + Send + Sync + 'static>(
        self,
        agg: Arc<Aggregator<S>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(path = %self.path.display(), "control listener started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let agg = agg.clone();
                        tokio::spawn(handle_connection(stream, agg));
                    }
                    Err(e) => warn!("control accept failed: {e}"),
                },
            }
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn handle_connection<S: Store + Send + Sync + 'static>(
    stream: UnixStream,
    agg: Arc<Aggregator<S>>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut line = String::new();
    if BufReader::new(reader).read_line(&mut line).await.is_err() {
        return;
    }

    let response = match dispatch(&line, &agg) {
        Ok(confirmation) => {
            // Mirror successful changes to the server's own output.
            println!("{confirmation}");
            confirmation
        }
        Err(e) => e.to_string(),
    };

    if let Err(e) = writer.write_all(format!("{response}\n").as_bytes()).await {
        warn!("control response write failed: {e}");
    }
}
