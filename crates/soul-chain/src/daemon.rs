//! The Peer Chain daemon: accepts and dials peer connections, exchanges
//! manifests, pulls files it's missing, applies merge rules to what it
//! receives, and keeps `.soul-chain-status` current.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use soul_core::error::{Error, Result};
use soul_core::SoulPath;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::discovery::{handshake_inbound, handshake_outbound, Discovery, PeerAddr};
use crate::health::{self, HealthInputs};
use crate::manifest::build_manifest;
use crate::merge::{clamp_mtime, merge_knowledge_graph, remote_wins};
use crate::peer::{PeerId, PeerStats};
use crate::status::{ChainStatus, write_status};
use crate::sync_set::is_merge_set;
use crate::wire::{read_message, write_message, Message};

pub struct ChainDaemon {
    pub soul: SoulPath,
    pub config: ChainConfig,
    pub encryption_key: [u8; 32],
    pub topic: [u8; 32],
    pub self_id: PeerId,
    peers: Arc<DashMap<PeerId, PeerStats>>,
    last_transfer: Arc<Mutex<Option<Instant>>>,
    last_manifest_exchange: Arc<Mutex<Option<Instant>>>,
    since: chrono::DateTime<Utc>,
}

impl ChainDaemon {
    pub fn new(soul: SoulPath, config: ChainConfig, encryption_key: [u8; 32], topic: [u8; 32]) -> Self {
        let mut id = [0u8; 32];
        id.copy_from_slice(&topic);
        Self {
            soul,
            config,
            encryption_key,
            topic,
            self_id: PeerId(id),
            peers: Arc::new(DashMap::new()),
            last_transfer: Arc::new(Mutex::new(None)),
            last_manifest_exchange: Arc::new(Mutex::new(None)),
            since: Utc::now(),
        }
    }

    /// Run until `cancel` fires. Spawns the accept loop and the periodic
    /// manifest-poll/status-refresh timers, and waits on all of them.
    pub async fn run(self: Arc<Self>, discovery: Arc<dyn Discovery>, peers: Vec<PeerAddr>, cancel: CancellationToken) -> Result<()> {
        let listener = discovery.listen(self.config.listen_port).await?;
        info!(port = self.config.listen_port, "soul-chain listening");

        let accept_daemon = self.clone();
        let accept_cancel = cancel.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, addr)) => {
                                debug!(%addr, "inbound peer connection");
                                let daemon = accept_daemon.clone();
                                let conn_cancel = accept_cancel.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = daemon.serve_inbound(stream, conn_cancel).await {
                                        warn!(%addr, error = %e, "peer connection ended with error");
                                    }
                                });
                            }
                            Err(e) => warn!(error = %e, "accept failed"),
                        }
                    }
                }
            }
        });

        let dial_daemon = self.clone();
        let dial_discovery = discovery.clone();
        let dial_cancel = cancel.clone();
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let dial_task = tokio::spawn(async move {
            for peer in peers {
                let daemon = dial_daemon.clone();
                let discovery = dial_discovery.clone();
                let conn_cancel = dial_cancel.clone();
                if dial_cancel.is_cancelled() {
                    break;
                }
                tokio::spawn(async move {
                    match tokio::time::timeout(connect_timeout, discovery.connect(&peer)).await {
                        Ok(Ok(stream)) => {
                            if let Err(e) = daemon.serve_outbound(stream, conn_cancel).await {
                                warn!(addr = %peer.addr, error = %e, "outbound peer connection ended with error");
                            }
                        }
                        Ok(Err(e)) => warn!(addr = %peer.addr, error = %e, "failed to dial peer"),
                        Err(_) => warn!(addr = %peer.addr, "dial timed out"),
                    }
                });
            }
        });

        let status_daemon = self.clone();
        let status_cancel = cancel.clone();
        let status_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(status_daemon.config.status_refresh_ms));
            loop {
                tokio::select! {
                    _ = status_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = status_daemon.refresh_status().await {
                            warn!(error = %e, "failed to refresh chain status");
                        }
                    }
                }
            }
        });

        let _ = tokio::join!(accept_task, dial_task, status_task);
        Ok(())
    }

    async fn serve_inbound<S>(self: Arc<Self>, mut stream: S, cancel: CancellationToken) -> Result<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
    {
        handshake_inbound(&mut stream, &self.topic).await?;
        self.with_tracked_peer(stream, cancel).await
    }

    async fn serve_outbound<S>(self: Arc<Self>, mut stream: S, cancel: CancellationToken) -> Result<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
    {
        handshake_outbound(&mut stream, &self.topic).await?;
        self.with_tracked_peer(stream, cancel).await
    }

    /// Registers an ephemeral `PeerStats` entry for the lifetime of one
    /// connection, so `peers.len()` (fed into the health computation)
    /// reflects currently-connected peers. The handshake authenticates the
    /// topic but doesn't exchange a stable peer identity, so each connection
    /// gets a fresh random id rather than a persistent one.
    async fn with_tracked_peer<S>(&self, stream: S, cancel: CancellationToken) -> Result<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let id = PeerId(rand::random());
        self.peers.insert(id, PeerStats::new(id));
        let result = self.exchange(stream, cancel).await;
        self.peers.remove(&id);
        result
    }

    /// One connection's manifest/need/file exchange. Stays open until the
    /// peer closes the stream, a protocol error repeats three times within
    /// 60 s, a single read stalls past `connect_timeout_ms`, or `cancel`
    /// fires. The local manifest is re-built and re-sent on
    /// `manifest_poll_ms` whenever it changed since the last send; pending
    /// `need` requests are capped at `max_in_flight_per_peer` in flight at
    /// once, topped up as files arrive.
    async fn exchange<S>(&self, stream: S, cancel: CancellationToken) -> Result<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        let io_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let in_flight_cap = self.config.max_in_flight_per_peer;

        let mut local_manifest = build_manifest(self.soul.root())?;
        write_message(&mut write_half, &Message::manifest(&local_manifest)).await?;
        *self.last_manifest_exchange.lock().await = Some(Instant::now());

        let mut pending_needs: VecDeque<String> = VecDeque::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut manifest_poll = tokio::time::interval(Duration::from_millis(self.config.manifest_poll_ms));
        manifest_poll.tick().await;
        let mut protocol_errors: VecDeque<Instant> = VecDeque::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = manifest_poll.tick() => {
                    let fresh = build_manifest(self.soul.root())?;
                    if fresh != local_manifest {
                        local_manifest = fresh;
                        write_message(&mut write_half, &Message::manifest(&local_manifest)).await?;
                        *self.last_manifest_exchange.lock().await = Some(Instant::now());
                    }
                }
                received = tokio::time::timeout(io_timeout, read_message(&mut reader)) => {
                    let message = match received {
                        Err(_) => {
                            warn!(?io_timeout, "peer i/o timed out");
                            return Err(Error::transient(
                                self.soul.root().to_path_buf(),
                                std::io::Error::new(std::io::ErrorKind::TimedOut, "peer i/o timeout"),
                            ));
                        }
                        Ok(Err(Error::Protocol(reason))) => {
                            let window = Duration::from_secs(60);
                            let now = Instant::now();
                            protocol_errors.retain(|t| now.duration_since(*t) < window);
                            protocol_errors.push_back(now);
                            warn!(reason, "dropped malformed message from peer");
                            if protocol_errors.len() >= 3 {
                                warn!("dropping peer after three protocol errors in 60s");
                                return Ok(());
                            }
                            continue;
                        }
                        Ok(Err(e)) => return Err(e),
                        Ok(Ok(None)) => return Ok(()),
                        Ok(Ok(Some(m))) => m,
                    };
                    match message {
                        Message::Manifest { files } => {
                            *self.last_manifest_exchange.lock().await = Some(Instant::now());
                            for entry in &files {
                                let local = local_manifest.get(&entry.path);
                                let now_ms = Utc::now().timestamp_millis();
                                let remote_mtime = clamp_mtime(entry.mtime, now_ms);
                                let should_pull = match local {
                                    Some(local_entry) => {
                                        is_merge_set(std::path::Path::new(&entry.path))
                                            || remote_wins(&local_entry.hash, &entry.hash, local_entry.mtime, remote_mtime)
                                    }
                                    None => true,
                                };
                                if should_pull
                                    && !in_flight.contains(&entry.path)
                                    && !pending_needs.contains(&entry.path)
                                {
                                    pending_needs.push_back(entry.path.clone());
                                }
                            }
                            self.top_up_needs(&mut write_half, &mut pending_needs, &mut in_flight, in_flight_cap).await?;
                        }
                        Message::Need { path } => {
                            self.send_file(&mut write_half, &path).await?;
                        }
                        Message::File { path, data, mtime } => {
                            let ciphertext = crate::wire::decode_base64_payload(&data)?;
                            self.apply_incoming_file(&path, &ciphertext, mtime).await?;
                            *self.last_transfer.lock().await = Some(Instant::now());
                            in_flight.remove(&path);
                            self.top_up_needs(&mut write_half, &mut pending_needs, &mut in_flight, in_flight_cap).await?;
                        }
                    }
                }
            }
        }
    }

    /// Send `need` requests until `in_flight` reaches `cap`, draining
    /// `pending`. Keeps at most `cap` outbound requests outstanding per
    /// peer; a file arriving frees a slot for the next pending path.
    async fn top_up_needs<W: tokio::io::AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        pending: &mut VecDeque<String>,
        in_flight: &mut HashSet<String>,
        cap: usize,
    ) -> Result<()> {
        while in_flight.len() < cap {
            let Some(path) = pending.pop_front() else { break };
            write_message(writer, &Message::need(path.clone())).await?;
            in_flight.insert(path);
        }
        Ok(())
    }

    async fn send_file<W: tokio::io::AsyncWrite + Unpin>(&self, writer: &mut W, rel_path: &str) -> Result<()> {
        let full_path = self.soul.root().join(rel_path);
        let mut file = tokio::fs::File::open(&full_path)
            .await
            .map_err(|e| Error::transient(full_path.clone(), e))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content).await?;

        let ciphertext = crate::crypto::encrypt(&self.encryption_key, &content)
            .map_err(|_| Error::AuthFailed)?;
        let mtime = fs_mtime_ms(&full_path)?;
        write_message(writer, &Message::file(rel_path, &ciphertext, mtime)).await
    }

    async fn apply_incoming_file(&self, rel_path: &str, ciphertext: &[u8], _mtime: i64) -> Result<()> {
        let plaintext = crate::crypto::decrypt(&self.encryption_key, ciphertext)?;
        let full_path = self.soul.root().join(rel_path);

        if is_merge_set(std::path::Path::new(rel_path)) {
            let existing = std::fs::read_to_string(&full_path).unwrap_or_default();
            let incoming = String::from_utf8_lossy(&plaintext);
            let merged = merge_knowledge_graph(&existing, &incoming);
            soul_core::atomic::write_atomic(&full_path, merged.as_bytes())?;
        } else {
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::transient(parent.to_path_buf(), e))?;
            }
            soul_core::atomic::write_atomic(&full_path, &plaintext)?;
        }
        Ok(())
    }

    async fn refresh_status(&self) -> Result<()> {
        let since_transfer = self.last_transfer.lock().await.map(|t| t.elapsed());
        let since_manifest = self.last_manifest_exchange.lock().await.map(|t| t.elapsed());
        let health = health::compute(HealthInputs {
            peer_count: self.peers.len(),
            since_last_file_transfer: since_transfer,
            since_last_manifest_exchange: since_manifest,
        });

        let mut status = ChainStatus::new(self.since);
        status.health = health;
        status.peers = self.peers.iter().map(|e| e.value().into()).collect();
        write_status(&self.soul, &status)
    }
}

fn fs_mtime_ms(path: &PathBuf) -> Result<i64> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::transient(path.clone(), e))?;
    let modified = metadata.modified().map_err(|e| Error::transient(path.clone(), e))?;
    let millis = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(millis)
}
