use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::app::Result;

/// Send one command line to a running aggregator and return its one-line
/// response.
pub async fn send_command(socket_path: &Path, command: &str) -> Result<String> {
    let stream = UnixStream::connect(socket_path).await?;
    let (reader, mut writer) = stream.into_split();

    writer.write_all(format!("{command}\n").as_bytes()).await?;

    let mut response = String::new();
    BufReader::new(reader).read_line(&mut response).await?;
    Ok(response.trim_end().to_string())
}
