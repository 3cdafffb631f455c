//! Line transport: one request per input line, one JSON response per output line

use super::ToolHandler;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Serve the handler over stdin/stdout until stdin closes
pub async fn serve_stdio(handler: &ToolHandler) -> std::io::Result<()> {
    log::info!("Tool server ready on stdio");
    serve_lines(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

pub async fn serve_lines<R, W>(handler: &ToolHandler, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(reply) = handler.handle_line(&line).await {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    log::info!("Input closed, stopping stdio transport");
    Ok(())
}
