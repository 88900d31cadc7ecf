use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use loom_capability::Dispatcher;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::message::{Request, Response};

/// Answer frames from `reader` on `writer` until EOF or cancellation.
///
/// Every frame is handled concurrently with the ones before it, so a slow
/// weave on one loom does not hold back requests for another. Responses are
/// written as they finish and may arrive out of order; clients correlate them
/// by `id`. At EOF the server stops reading and drains in-flight requests.
/// Blank lines are ignored.
pub async fn serve<R, W>(
  reader: R,
  mut writer: W,
  dispatcher: &Dispatcher,
  cancel: CancellationToken,
) -> Result<(), ProtocolError>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut lines = reader.lines();
  let mut pending: FuturesUnordered<BoxFuture<'_, Response>> = FuturesUnordered::new();
  let mut reading = true;
  let mut served = 0usize;

  while reading || !pending.is_empty() {
    tokio::select! {
      _ = cancel.cancelled() => {
        info!(served, in_flight = pending.len(), "protocol server cancelled");
        break;
      }
      Some(response) = pending.next(), if !pending.is_empty() => {
        write_frame(&mut writer, &response).await?;
        served += 1;
      }
      line = lines.next_line(), if reading => match line? {
        None => {
          info!(served, in_flight = pending.len(), "protocol client closed the stream");
          reading = false;
        }
        Some(line) if line.trim().is_empty() => {}
        Some(line) => pending.push(Box::pin(async move { handle_line(dispatcher, &line).await })),
      },
    }
  }

  Ok(())
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<(), ProtocolError> {
  let mut frame = serde_json::to_vec(response)?;
  frame.push(b'\n');
  writer.write_all(&frame).await?;
  writer.flush().await?;
  Ok(())
}

/// Turn one request frame into its response.
pub async fn handle_line(dispatcher: &Dispatcher, line: &str) -> Response {
  let (id, request) = Request::parse(line);

  match request {
    Ok(Request::ListTools) => {
      debug!(id = %id, "tools/list");
      Response::result(id, to_value(&dispatcher.list()))
    }
    Ok(Request::CallTool { params }) => {
      debug!(id = %id, capability = %params.name, "tools/call");
      let envelope = dispatcher.invoke(&params.name, params.arguments).await;
      Response::result(id, to_value(&envelope))
    }
    Err(e) => {
      warn!(id = %id, error = %e, "rejected protocol frame");
      Response::error(id, &e)
    }
  }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
  // Descriptors and envelopes are plain data with string keys.
  serde_json::to_value(value).unwrap_or(Value::Null)
}
