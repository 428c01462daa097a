//! One client session, command loop and dispatch.
//!
//! A session owns its connection end-to-end: read a line, parse it, answer
//! it, repeat. Every per-command failure is converted into a failure
//! response here; only a transport error (or the peer closing) ends the
//! loop, and it ends only this session.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::audio::AudioEngine;
use crate::catalog::Catalog;
use crate::protocol::command::Command;
use crate::protocol::frame::{write_response, Response};
use crate::protocol::MAX_COMMAND_LINE;
use crate::validate::validate;

pub struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    catalog: Arc<Catalog>,
    engine: Arc<dyn AudioEngine>,
    audio_dir: PathBuf,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        catalog: Arc<Catalog>,
        engine: Arc<dyn AudioEngine>,
        audio_dir: PathBuf,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            catalog,
            engine,
            audio_dir,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut line = String::new();

        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                debug!("peer closed the connection");
                break;
            }
            if line.len() > MAX_COMMAND_LINE {
                write_response(&mut self.writer, &Response::err("command line too long")).await?;
                continue;
            }

            let command = Command::parse(&line);
            debug!("dispatching {:?}", command);

            let response = self.dispatch(command).await;
            write_response(&mut self.writer, &response).await?;
        }

        Ok(())
    }

    async fn dispatch(&self, command: Command) -> Response {
        match command {
            Command::List => self.handle_list(),
            Command::Get {
                filename,
                start,
                end,
            } => self.handle_get(&filename, &start, &end).await,
            Command::Unknown { raw } => {
                info!("unknown command: {}", raw);
                Response::err(format!("unknown command: {}", raw))
            }
            Command::Malformed { reason } => {
                info!("malformed command: {}", reason);
                Response::err(reason)
            }
        }
    }

    fn handle_list(&self) -> Response {
        match serde_json::to_vec(self.catalog.entries()) {
            Ok(json) => Response::ok(json),
            Err(err) => {
                error!("catalog serialization failed: {}", err);
                Response::err(format!("failed to serialize catalog: {}", err))
            }
        }
    }

    async fn handle_get(&self, filename: &str, start: &str, end: &str) -> Response {
        let range = match validate(
            filename,
            start,
            end,
            &self.catalog,
            &self.audio_dir,
            self.engine.as_ref(),
        )
        .await
        {
            Ok(range) => range,
            Err(err) => {
                info!("rejected GET {}: {}", filename, err);
                return Response::err(err.to_string());
            }
        };

        match self
            .engine
            .extract(&range.path, range.start_ms, range.end_ms)
            .await
        {
            Ok(bytes) => {
                info!(
                    "serving '{}' [{}ms..{}ms), {} bytes",
                    filename,
                    range.start_ms,
                    range.end_ms,
                    bytes.len()
                );
                Response::ok(bytes)
            }
            Err(err) => {
                warn!("extraction failed for '{}': {}", filename, err);
                Response::err(format!("failed to read audio file: {}", err))
            }
        }
    }
}
