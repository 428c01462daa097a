//! Client side of the command protocol.

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::info;

use crate::catalog::CatalogEntry;
use crate::protocol::command::{encode_get, encode_list};
use crate::protocol::frame::{read_response, Status};

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> anyhow::Result<Client> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("failed to connect to {}:{}", host, port))?;
        info!("connected to {}:{}", host, port);
        Ok(Client { stream })
    }

    /// Fetch the catalog listing.
    pub async fn list(&mut self) -> anyhow::Result<Vec<CatalogEntry>> {
        self.stream.write_all(encode_list().as_bytes()).await?;
        let response = read_response(&mut self.stream).await?;
        match response.status {
            Status::Ok => {
                serde_json::from_slice(&response.payload).context("malformed catalog listing")
            }
            Status::Err => bail!("server error: {}", response.error_text()),
        }
    }

    /// Fetch an excerpt. Time tokens pass through verbatim; the server owns
    /// their validation and its error text is surfaced as the error here.
    pub async fn fetch(
        &mut self,
        filename: &str,
        start: &str,
        end: &str,
    ) -> anyhow::Result<Vec<u8>> {
        self.stream
            .write_all(encode_get(filename, start, end).as_bytes())
            .await?;
        let response = read_response(&mut self.stream).await?;
        match response.status {
            Status::Ok => Ok(response.payload),
            Status::Err => bail!("server error: {}", response.error_text()),
        }
    }
}
