//! Zone transfer source (AXFR over TCP).

use futures_util::StreamExt;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use zonestats_core::{canonical_name, ResourceRecord, Result, ZoneStatsError};

use super::RecordStream;

/// Connect, write and read timeout
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Records buffered between the socket and the dispatcher
const CHANNEL_DEPTH: usize = 1024;

/// Start a transfer of `zone` from `server`.
///
/// The connection is made here so an unreachable server fails the run
/// before any record is dispatched. Records are then streamed as the
/// response messages arrive.
pub(super) async fn transfer(server: SocketAddr, zone: String) -> Result<RecordStream> {
    let zone = Name::from_ascii(canonical_name(&zone))
        .map_err(|e| ZoneStatsError::Transfer(format!("invalid zone name {zone}: {e}")))?;

    let stream = timeout(TRANSFER_TIMEOUT, TcpStream::connect(server))
        .await
        .map_err(|_| ZoneStatsError::Transfer(format!("connecting to {server} timed out")))?
        .map_err(|e| ZoneStatsError::Transfer(format!("connecting to {server}: {e}")))?;
    info!(server = %server, zone = %zone, "zone transfer started");

    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::spawn(async move {
        match receive_zone(stream, zone, &tx).await {
            Ok(count) => info!(server = %server, records = count, "zone transfer complete"),
            Err(e) => {
                // The receiver may already be gone; nothing left to tell then.
                let _ = tx.send(Err(e)).await;
            }
        }
    });

    Ok(ReceiverStream::new(rx).boxed())
}

fn axfr_query(id: u16, zone: Name) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(zone, RecordType::AXFR));
    message
}

/// Read response messages until the closing SOA and forward their records.
async fn receive_zone(
    mut stream: TcpStream,
    zone: Name,
    tx: &mpsc::Sender<Result<ResourceRecord>>,
) -> Result<usize> {
    let query = axfr_query(rand::random(), zone);
    let wire = query
        .to_vec()
        .map_err(|e| ZoneStatsError::Transfer(format!("encoding query: {e}")))?;
    let len = u16::try_from(wire.len())
        .map_err(|_| ZoneStatsError::Transfer("query too large".into()))?;

    let mut frame = Vec::with_capacity(wire.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&wire);
    timeout(TRANSFER_TIMEOUT, stream.write_all(&frame))
        .await
        .map_err(|_| ZoneStatsError::Transfer("sending query timed out".into()))?
        .map_err(|e| ZoneStatsError::Transfer(format!("sending query: {e}")))?;

    let mut count = 0_usize;
    loop {
        let response = read_message(&mut stream).await?;
        if response.id() != query.id() {
            return Err(ZoneStatsError::Transfer(format!(
                "response id {} does not match query id {}",
                response.id(),
                query.id()
            )));
        }
        if response.response_code() != ResponseCode::NoError {
            return Err(ZoneStatsError::Transfer(format!(
                "server answered {}",
                response.response_code()
            )));
        }
        debug!(answers = response.answers().len(), "transfer message");

        for record in response.answers() {
            let is_soa = record.record_type() == RecordType::SOA;
            if count == 0 && !is_soa {
                return Err(ZoneStatsError::Transfer(format!(
                    "transfer starts with {} instead of SOA",
                    record.record_type()
                )));
            }
            if count > 0 && is_soa {
                return Ok(count);
            }

            count += 1;
            let record = ResourceRecord::from_hickory(record)?;
            if tx.send(Ok(record)).await.is_err() {
                debug!("record consumer went away, stopping transfer");
                return Ok(count);
            }
        }
    }
}

async fn read_message(stream: &mut TcpStream) -> Result<Message> {
    let mut len = [0_u8; 2];
    read_exact(stream, &mut len).await?;

    let mut buf = vec![0_u8; usize::from(u16::from_be_bytes(len))];
    read_exact(stream, &mut buf).await?;

    Message::from_vec(&buf)
        .map_err(|e| ZoneStatsError::Transfer(format!("malformed response: {e}")))
}

async fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<()> {
    timeout(TRANSFER_TIMEOUT, stream.read_exact(buf))
        .await
        .map_err(|_| ZoneStatsError::Transfer("read timed out".into()))?
        .map_err(|e| ZoneStatsError::Transfer(format!("connection closed mid-transfer: {e}")))?;
    Ok(())
}
