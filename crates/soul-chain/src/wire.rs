//! Newline-delimited JSON wire protocol. No length prefix: each message is
//! one line, UTF-8, terminated by `\n`. Lines over 8 MiB are rejected
//! rather than read unbounded into memory.

use serde::{Deserialize, Serialize};
use soul_core::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::manifest::Manifest;

const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Manifest {
        files: Vec<crate::manifest::FileEntry>,
    },
    Need {
        path: String,
    },
    File {
        path: String,
        data: String,
        mtime: i64,
    },
}

impl Message {
    pub fn manifest(manifest: &Manifest) -> Self {
        Message::Manifest {
            files: manifest.files.clone(),
        }
    }

    pub fn need(path: impl Into<String>) -> Self {
        Message::Need { path: path.into() }
    }

    pub fn file(path: impl Into<String>, ciphertext: &[u8], mtime: i64) -> Self {
        use base64::Engine;
        Message::File {
            path: path.into(),
            data: base64::engine::general_purpose::STANDARD.encode(ciphertext),
            mtime,
        }
    }

    pub fn decode_file_data(&self) -> Result<Vec<u8>> {
        match self {
            Message::File { data, .. } => decode_base64_payload(data),
            _ => Err(Error::Protocol("not a file message".to_string())),
        }
    }
}

pub fn decode_base64_payload(data: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| Error::Protocol(format!("invalid base64 payload: {e}")))
}

pub fn encode_line(message: &Message) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line(line: &str) -> Result<Message> {
    if line.len() > MAX_LINE_BYTES {
        return Err(Error::Protocol("line exceeds 8 MiB limit".to_string()));
    }
    serde_json::from_str(line.trim_end()).map_err(|e| Error::Protocol(e.to_string()))
}

pub async fn write_message<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<()> {
    let line = encode_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next message from a buffered reader. Returns `Ok(None)` on a
/// clean EOF (peer closed the connection).
pub async fn read_message<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<Option<Message>> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    Ok(Some(decode_line(&line)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_message_round_trips() {
        let manifest = Manifest {
            files: vec![crate::manifest::FileEntry {
                path: "SEED.md".to_string(),
                hash: "abcdef0123456789".to_string(),
                mtime: 12345,
            }],
        };
        let msg = Message::manifest(&manifest);
        let line = encode_line(&msg).unwrap();
        assert!(line.ends_with('\n'));
        let decoded = decode_line(&line).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn need_message_round_trips() {
        let msg = Message::need("SEED.md");
        let decoded = decode_line(&encode_line(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn file_message_base64_round_trips() {
        let msg = Message::file("SEED.md", b"encrypted-bytes", 999);
        let decoded = decode_line(&encode_line(&msg).unwrap()).unwrap();
        assert_eq!(decoded.decode_file_data().unwrap(), b"encrypted-bytes");
    }

    #[test]
    fn oversized_line_is_rejected() {
        let huge = "x".repeat(MAX_LINE_BYTES + 1);
        assert!(decode_line(&huge).is_err());
    }

    #[tokio::test]
    async fn write_then_read_over_a_duplex_stream() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = client;
        let mut reader = BufReader::new(server);

        write_message(&mut writer, &Message::need("x")).await.unwrap();
        let msg = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(msg, Message::need("x"));
    }
}
