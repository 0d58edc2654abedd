//! The receive loop: one spawned task per client that frames, parses and
//! dispatches inbound messages and reconnects with backoff when the
//! connection drops.

use std::ops::ControlFlow;
use std::sync::Arc;

use rotel_parser::{parse_line, LineFramer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::{ConnectionState, ReconnectEvent, ReconnectMachine};
use crate::connection::ConnectionReader;
use crate::shared::Shared;

/// Control handle for a running receive loop.
pub(crate) struct ReceiveLoopHandle {
    cancel: CancellationToken,
    handoff: mpsc::Sender<ConnectionReader>,
    task: JoinHandle<()>,
}

impl ReceiveLoopHandle {
    pub(crate) fn spawn(shared: Arc<Shared>, reader: ConnectionReader) -> Self {
        let cancel = CancellationToken::new();
        let (handoff_tx, handoff_rx) = mpsc::channel(1);

        let config = &shared.config;
        let receive_loop = ReceiveLoop {
            framer: LineFramer::with_max_buffer(
                shared.profile.terminator_rx.as_bytes(),
                config.max_frame_buffer,
            ),
            machine: ReconnectMachine::new(config.backoff_floor, config.backoff_ceiling),
            cancel: cancel.clone(),
            handoff: handoff_rx,
            shared: Arc::clone(&shared),
        };
        let task = tokio::spawn(receive_loop.run(reader));

        Self {
            cancel,
            handoff: handoff_tx,
            task,
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Give a freshly opened connection to a loop that is waiting to reconnect.
    pub(crate) fn hand_off(&self, reader: ConnectionReader) -> Result<(), ConnectionReader> {
        self.handoff
            .try_send(reader)
            .map_err(|e| e.into_inner())
    }

    /// Cancel the loop and wait until it has stopped.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            if e.is_panic() {
                error!("Receive loop panicked: {}", e);
            }
        }
    }
}

impl Drop for ReceiveLoopHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct ReceiveLoop {
    shared: Arc<Shared>,
    framer: LineFramer,
    machine: ReconnectMachine,
    cancel: CancellationToken,
    handoff: mpsc::Receiver<ConnectionReader>,
}

impl ReceiveLoop {
    async fn run(mut self, reader: ConnectionReader) {
        let mut reader = Some(reader);
        let mut buf = vec![0u8; self.shared.config.read_chunk_size];
        debug!("Receive loop started for {}", self.shared.addr());

        loop {
            if let Some(active) = reader.as_mut() {
                let read = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    read = active.receive(&mut buf) => read,
                };

                match read {
                    Ok(n) => {
                        self.handle_chunk(&buf[..n]);
                        self.machine.handle(ReconnectEvent::ReadSucceeded);
                        continue;
                    }
                    Err(e) => warn!("Reader error on {}: {}", self.shared.addr(), e),
                }
            }

            reader = None;
            match self.reconnect().await {
                ControlFlow::Continue(next) => reader = next,
                ControlFlow::Break(()) => break,
            }
        }

        self.framer.clear();
        debug!("Receive loop stopped for {}", self.shared.addr());
    }

    fn handle_chunk(&mut self, chunk: &[u8]) {
        self.framer.push(chunk);
        while let Some(frame) = self.framer.next_frame() {
            trace!("{} -> {}", self.shared.host, frame);
            match parse_line(&frame, &self.shared.profile.terminator_rx) {
                Some(message) => self.shared.listeners.dispatch(&message),
                None => debug!("Ignoring unparsable frame: {:?}", frame),
            }
        }
    }

    /// One reconnect attempt after a lost connection.
    ///
    /// Yields the new reader on success, `None` when the attempt failed (the
    /// loop retries with a longer delay) and breaks when cancelled.
    async fn reconnect(&mut self) -> ControlFlow<(), Option<ConnectionReader>> {
        let shared = Arc::clone(&self.shared);
        let delay = self
            .machine
            .handle(ReconnectEvent::ReadFailed)
            .reconnect_delay()
            .unwrap_or(shared.config.backoff_floor);
        self.framer.clear();

        {
            let _lifecycle = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ControlFlow::Break(()),
                guard = shared.lifecycle.lock() => guard,
            };
            if let Ok(reader) = self.handoff.try_recv() {
                return self.adopt(reader);
            }
            shared.close_writer().await;
            shared.set_state(ConnectionState::Disconnected);
            shared.set_state(ConnectionState::Reconnecting(delay));
        }

        debug!("Reconnecting to {} in {:?}", shared.addr(), delay);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ControlFlow::Break(()),
            handed = self.handoff.recv() => {
                return match handed {
                    Some(reader) => self.adopt(reader),
                    None => ControlFlow::Break(()),
                };
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let lifecycle = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ControlFlow::Break(()),
            guard = shared.lifecycle.lock() => guard,
        };
        if let Ok(reader) = self.handoff.try_recv() {
            return self.adopt(reader);
        }
        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ControlFlow::Break(()),
            opened = shared.open_connection() => opened,
        };
        drop(lifecycle);

        match opened {
            Ok(reader) => {
                self.machine.handle(ReconnectEvent::ConnectSucceeded);
                info!("Reconnected to {}", shared.addr());
                if shared.config.resync_on_reconnect {
                    let resynced = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => false,
                        _ = self.resync() => true,
                    };
                    if !resynced {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(Some(reader))
            }
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                self.machine.handle(ReconnectEvent::ConnectFailed);
                ControlFlow::Continue(None)
            }
        }
    }

    /// Take over a connection opened by an explicit `connect`.
    fn adopt(&mut self, reader: ConnectionReader) -> ControlFlow<(), Option<ConnectionReader>> {
        debug!("Receive loop adopted new connection to {}", self.shared.addr());
        self.machine.handle(ReconnectEvent::ConnectSucceeded);
        ControlFlow::Continue(Some(reader))
    }

    async fn resync(&self) {
        self.shared.enable_push_updates().await;
        self.shared.refresh_all().await;
    }
}
