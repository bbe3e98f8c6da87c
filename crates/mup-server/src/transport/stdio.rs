//! Stdio transport: one envelope per line on stdin/stdout.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::MupResult;

use super::{Frame, FrameTransport};

/// Newline-delimited frames over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    label: String,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, label: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            label: label.into(),
        }
    }
}

#[async_trait]
impl<R, W> FrameTransport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> MupResult<Option<Frame>> {
        let mut line = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut line).await?;
        if bytes_read == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        // Lines that are not UTF-8 stay raw so the codec can reject them.
        Ok(Some(match String::from_utf8(line) {
            Ok(text) => Frame::Text(text),
            Err(e) => Frame::Binary(e.into_bytes()),
        }))
    }

    async fn send(&mut self, frame: String) -> MupResult<()> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    fn peer(&self) -> String {
        self.label.clone()
    }
}

/// Serves a single MUP connection over the process's stdin/stdout.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Run until stdin closes.
    pub async fn run(&self) -> MupResult<()> {
        tracing::info!("Serving MUP over stdio");
        let transport = LineTransport::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            "stdio",
        );
        self.handler.serve(transport).await
    }
}
