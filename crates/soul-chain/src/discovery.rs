//! Peer discovery and transport. A full DHT-style swarm (content-addressed
//! peer routing keyed by the derived topic) is out of proportion for a
//! single-soul sync daemon talking to a handful of trusted devices, so this
//! abstracts discovery behind a trait and ships one concrete implementation:
//! a topic-gated TCP listener/connector pair. Swapping in mDNS or a real DHT
//! later only means adding another `Discovery` impl.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use soul_core::error::{Error, Result};
use tokio::net::{TcpListener, TcpStream};

/// A discovered peer address, scoped to one topic (one soul's derived key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerAddr {
    pub addr: SocketAddr,
}

/// Abstracts "find peers for this topic" and "accept inbound connections for
/// this topic" so the daemon doesn't depend on one concrete discovery
/// mechanism.
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    async fn listen(&self, port: u16) -> Result<TcpListener>;
    async fn connect(&self, peer: &PeerAddr) -> Result<TcpStream>;
}

/// Direct-dial discovery: peers are supplied up front (from `.soul-chain`
/// config or a `join` invitation) rather than found via broadcast or a DHT.
/// The topic itself isn't used for routing here — it authenticates the
/// connection once established, via the handshake in [`handshake`].
pub struct DirectDiscovery;

#[async_trait::async_trait]
impl Discovery for DirectDiscovery {
    async fn listen(&self, port: u16) -> Result<TcpListener> {
        let addr: SocketAddr = format!("0.0.0.0:{port}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen port {port}: {e}")))?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| Error::transient(std::path::PathBuf::from(format!("tcp:{addr}")), e))
    }

    async fn connect(&self, peer: &PeerAddr) -> Result<TcpStream> {
        TcpStream::connect(peer.addr)
            .await
            .map_err(|e| Error::transient(std::path::PathBuf::from(format!("tcp:{}", peer.addr)), e))
    }
}

/// First bytes exchanged on a new connection: both sides prove they derived
/// the same topic from the same mnemonic before any manifest/file traffic
/// flows. `topic` here is the 32-byte value from `kdf::topic`, sent as a
/// hex string on its own line.
pub async fn handshake_outbound<S>(stream: &mut S, topic: &[u8; 32]) -> Result<()>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;
    let line = format!("{}\n", hex_encode(topic));
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn handshake_inbound<S>(stream: &mut S, expected_topic: &[u8; 32]) -> Result<()>
where
    S: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;
    let mut reader = tokio::io::BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let received = line.trim();
    if received != hex_encode(expected_topic) {
        return Err(Error::AuthFailed);
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handshake_succeeds_with_matching_topic() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let topic = [7u8; 32];
        let send = handshake_outbound(&mut client, &topic);
        let recv = handshake_inbound(&mut server, &topic);
        let (send_result, recv_result) = tokio::join!(send, recv);
        send_result.unwrap();
        recv_result.unwrap();
    }

    #[tokio::test]
    async fn handshake_fails_with_mismatched_topic() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let send = handshake_outbound(&mut client, &[1u8; 32]);
        let recv = handshake_inbound(&mut server, &[2u8; 32]);
        let (send_result, recv_result) = tokio::join!(send, recv);
        send_result.unwrap();
        assert!(recv_result.is_err());
    }

    #[test]
    fn hex_encode_matches_expected_width() {
        assert_eq!(hex_encode(&[0xab, 0xcd]), "abcd");
    }
}
