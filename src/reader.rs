//! Reader handle, connection task and state machine.
//!
//! One connection runs on two owners: a pump thread that holds the transport
//! (drains queued writes, polls reads, forwards chunks), and a single Tokio
//! task that holds the frame assembler, the response router and the reader
//! state. Every frame dispatch and state transition happens sequentially
//! inside that task; commands reach it as messages carrying their completion
//! sender and resolve later, when the matching response frame arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::checksum;
use crate::commands;
use crate::error::{DeviceFault, R2000Error};
use crate::frame::{Frame, FrameAssembler, RESP_ERROR, RESP_NO_TAG};
use crate::router::ResponseRouter;
use crate::transport::RfidTransport;
use crate::types::{
    BaudRate, FilterType, PowerOption, ReaderEvent, ReaderState, Tag, TagInfo, WriteTagResult,
    bytes_to_hex,
};

/// Per-iteration read timeout of the pump thread
const READ_POLL_MS: u32 = 10;
/// Pump read buffer size
const READ_BUF_LEN: usize = 256;
/// Capacity of the lifecycle event channel
const EVENT_CAPACITY: usize = 64;

/// Messages from the pump thread to the connection task
enum TransportEvent {
    Data(Vec<u8>),
    Error(String),
    Closed,
}

/// Messages from the public handle to the connection task
enum CoreRequest {
    /// Register a one-shot waiter under `response_code`, then send the command.
    Command {
        bytes: Vec<u8>,
        response_code: u8,
        reply: oneshot::Sender<Frame>,
    },
    /// Register the persistent inventory subscriber and enter the Reading state.
    StartInventory {
        bytes: Vec<u8>,
        reply: oneshot::Sender<mpsc::UnboundedReceiver<Frame>>,
    },
    /// Fire-and-forget write (best-effort stop while closing).
    Write { bytes: Vec<u8> },
    Close,
}

struct Shared {
    connected: AtomicBool,
    reading: AtomicBool,
}

impl Shared {
    fn snapshot(&self) -> ReaderState {
        ReaderState {
            connected: self.connected.load(Ordering::Relaxed),
            reading: self.reading.load(Ordering::Relaxed),
        }
    }
}

/// Continuous tag report stream produced by [`R2000::start_inventory`].
///
/// The subscription stays registered until the connection closes or a new
/// `start_inventory` call replaces it; dropping the stream cancels it.
pub struct TagStream {
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl TagStream {
    /// Receive the next tag report. Returns `None` once the subscription has
    /// been cancelled. Undecodable report frames are skipped.
    pub async fn recv(&mut self) -> Option<Tag> {
        while let Some(frame) = self.frames.recv().await {
            match commands::decode_tag(&frame) {
                Ok(tag) => return Some(tag),
                Err(e) => warn!("failed to decode tag report: {:?}", e),
            }
        }
        None
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Tag> {
        while let Ok(frame) = self.frames.try_recv() {
            match commands::decode_tag(&frame) {
                Ok(tag) => return Some(tag),
                Err(e) => warn!("failed to decode tag report: {:?}", e),
            }
        }
        None
    }
}

/// Handle to an open reader connection.
///
/// All methods take `&self`; the handle can be shared behind an `Arc`. A
/// command future that never receives its response pends forever — the module
/// guarantees no reply for lost frames — so callers wanting bounded waits
/// should wrap calls in `tokio::time::timeout` and may simply drop the
/// future; the stale waiter is purged and can never consume a later reply.
pub struct R2000 {
    requests: mpsc::UnboundedSender<CoreRequest>,
    events: broadcast::Sender<ReaderEvent>,
    shared: Arc<Shared>,
}

impl R2000 {
    /// Open a connection over the given transport.
    ///
    /// Spawns the connection task on the current Tokio runtime, so this must
    /// be called within a runtime context. The returned event receiver is
    /// subscribed before the task starts and therefore observes the `Opened`
    /// notification.
    pub fn open<T: RfidTransport>(transport: T) -> (Self, broadcast::Receiver<ReaderEvent>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = broadcast::channel(EVENT_CAPACITY);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let stop = Arc::new(AtomicBool::new(false));
        // connected from the moment the handle exists; the transport is
        // already open when it is handed to us
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            reading: AtomicBool::new(false),
        });

        {
            let stop = stop.clone();
            std::thread::spawn(move || pump(transport, write_rx, transport_tx, stop));
        }

        tokio::spawn(connection_task(
            request_rx,
            transport_rx,
            write_tx,
            event_tx.clone(),
            shared.clone(),
            stop,
        ));

        (
            Self {
                requests: request_tx,
                events: event_tx,
                shared,
            },
            event_rx,
        )
    }

    /// Subscribe another receiver to the lifecycle notifications
    /// (`Opened`/`Closed`/`Run`/`Wait`/device faults/transport errors).
    pub fn events(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Current connection/read state snapshot
    pub fn state(&self) -> ReaderState {
        self.shared.snapshot()
    }

    pub fn is_open(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    pub fn is_reading(&self) -> bool {
        self.shared.reading.load(Ordering::Relaxed)
    }

    /// Enable or disable each of the eight antenna ports
    pub async fn set_antennas(&self, ants: [bool; 8]) -> Result<(), R2000Error> {
        let frame = self
            .execute(commands::encode_set_antennas(&ants), commands::RESP_SET_ANTS)
            .await?;
        commands::decode_set_antennas(&frame)
    }

    /// Get the enabled state of the eight antenna ports
    pub async fn get_antennas(&self) -> Result<[bool; 8], R2000Error> {
        let frame = self
            .execute(commands::encode_get_antennas(), commands::RESP_GET_ANTS)
            .await?;
        commands::decode_get_antennas(&frame)
    }

    /// Set read/write power (dBi) and the loop flag
    pub async fn set_power(
        &self,
        write_power: u8,
        read_power: u8,
        is_loop: bool,
    ) -> Result<(), R2000Error> {
        let frame = self
            .execute(
                commands::encode_set_power(write_power, read_power, is_loop),
                commands::RESP_SET_POWER,
            )
            .await?;
        commands::decode_set_power(&frame)
    }

    /// Get the reader power configuration
    pub async fn get_power(&self) -> Result<PowerOption, R2000Error> {
        let frame = self
            .execute(commands::encode_get_power(), commands::RESP_GET_POWER)
            .await?;
        commands::decode_get_power(&frame)
    }

    /// Set the GPIO output states.
    ///
    /// Not supported by the R2000 hardware revision; kept for protocol
    /// completeness.
    pub async fn set_gpio(&self, gpios: [bool; 8]) -> Result<(), R2000Error> {
        let frame = self
            .execute(commands::encode_set_gpio(&gpios), commands::RESP_SET_GPIO)
            .await?;
        commands::decode_set_gpio(&frame)
    }

    /// Get the GPIO states.
    ///
    /// Not supported by the R2000 hardware revision; kept for protocol
    /// completeness.
    pub async fn get_gpio(&self) -> Result<[bool; 8], R2000Error> {
        let frame = self
            .execute(commands::encode_get_gpio(), commands::RESP_GET_GPIO)
            .await?;
        commands::decode_get_gpio(&frame)
    }

    /// Get the hardware version string, e.g. `"V1.0.0"`
    pub async fn hardware_version(&self) -> Result<String, R2000Error> {
        let frame = self
            .execute(
                commands::encode_hardware_version(),
                commands::RESP_HARDWARE_VERSION,
            )
            .await?;
        commands::decode_hardware_version(&frame)
    }

    /// Get the firmware version string, e.g. `"V1.0.0"`
    pub async fn firmware_version(&self) -> Result<String, R2000Error> {
        let frame = self
            .execute(
                commands::encode_firmware_version(),
                commands::RESP_FIRMWARE_VERSION,
            )
            .await?;
        commands::decode_firmware_version(&frame)
    }

    /// Query a single tag in the field
    pub async fn query_tag(&self) -> Result<Tag, R2000Error> {
        let frame = self
            .execute(commands::encode_query_tag(), commands::RESP_QUERY_TAG)
            .await?;
        commands::decode_tag(&frame)
    }

    /// Query tag memory, optionally narrowed to tags matching a filter.
    ///
    /// `password` must be exactly 4 bytes. `start_addr` and `data_len` are in
    /// words of the selected memory bank.
    pub async fn query_tag_filtered(
        &self,
        password: &[u8],
        filter_type: FilterType,
        filter_data: Option<&[u8]>,
        bank: u8,
        start_addr: u16,
        data_len: u16,
    ) -> Result<TagInfo, R2000Error> {
        let bytes = commands::encode_query_tag_filtered(
            password,
            filter_type,
            filter_data,
            bank,
            start_addr,
            data_len,
        )?;
        let frame = self
            .execute(bytes, commands::RESP_QUERY_TAG_FILTERED)
            .await?;
        commands::decode_query_tag_filtered(&frame)
    }

    /// Write data to tag memory, optionally narrowed to tags matching a
    /// filter.
    ///
    /// `password` must be exactly 4 bytes; the precondition is checked before
    /// any bytes reach the transport.
    pub async fn write_tag(
        &self,
        password: &[u8],
        filter_type: FilterType,
        filter_data: Option<&[u8]>,
        bank: u8,
        start_addr: u16,
        data: &[u8],
    ) -> Result<WriteTagResult, R2000Error> {
        let bytes = commands::encode_write_tag(
            password,
            filter_type,
            filter_data,
            bank,
            start_addr,
            data,
        )?;
        let frame = self.execute(bytes, commands::RESP_WRITE_TAG).await?;
        commands::decode_write_tag(&frame)
    }

    /// Set the serial baud rate.
    ///
    /// After a successful change the transport must be reopened at the new
    /// rate before further communication is possible.
    pub async fn set_baud_rate(&self, rate: BaudRate) -> Result<(), R2000Error> {
        let frame = self
            .execute(
                commands::encode_set_baud_rate(rate),
                commands::RESP_SET_BAUD_RATE,
            )
            .await?;
        commands::decode_set_baud_rate(&frame)
    }

    /// Set whether the module starts reading automatically on power-up
    pub async fn set_auto_read(&self, enabled: bool) -> Result<(), R2000Error> {
        let frame = self
            .execute(
                commands::encode_set_auto_read(enabled),
                commands::RESP_SET_AUTO_READ,
            )
            .await?;
        commands::decode_set_auto_read(&frame)
    }

    /// Set the heartbeat interval (units of 30 seconds).
    ///
    /// Not supported by the R2000 hardware revision; kept for protocol
    /// completeness.
    pub async fn set_heartbeat(&self, interval: u8) -> Result<(), R2000Error> {
        let frame = self
            .execute(
                commands::encode_set_heartbeat(interval),
                commands::RESP_SET_HEARTBEAT,
            )
            .await?;
        commands::decode_set_heartbeat(&frame)
    }

    /// Get the heartbeat interval.
    ///
    /// Not supported by the R2000 hardware revision; kept for protocol
    /// completeness.
    pub async fn get_heartbeat(&self) -> Result<u8, R2000Error> {
        let frame = self
            .execute(
                commands::encode_get_heartbeat(),
                commands::RESP_GET_HEARTBEAT,
            )
            .await?;
        commands::decode_get_heartbeat(&frame)
    }

    /// Start continuous inventory.
    ///
    /// Registers the persistent tag subscriber, emits `Run` and transitions
    /// to the Reading state. The module then pushes tag report frames until
    /// [`stop_inventory`](Self::stop_inventory) succeeds; each report is
    /// surfaced as one [`Tag`] on the returned stream. Calling this again
    /// replaces the previous stream.
    pub async fn start_inventory(&self) -> Result<TagStream, R2000Error> {
        if !self.is_open() {
            return Err(R2000Error::NotConnected);
        }
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(CoreRequest::StartInventory {
                bytes: commands::encode_start_inventory(),
                reply,
            })
            .map_err(|_| R2000Error::NotConnected)?;
        let frames = rx.await.map_err(|_| R2000Error::Closed)?;
        Ok(TagStream { frames })
    }

    /// Stop continuous inventory. On success the reader transitions back to
    /// the Idle state. Tag reports that arrived before the acknowledgment are
    /// delivered to the inventory stream first.
    pub async fn stop_inventory(&self) -> Result<(), R2000Error> {
        let frame = self
            .execute(
                commands::encode_stop_inventory(),
                commands::RESP_STOP_INVENTORY,
            )
            .await?;
        commands::decode_stop_inventory(&frame)
    }

    /// Close the connection.
    ///
    /// If inventory is running a best-effort stop command is queued first;
    /// the close proceeds regardless of its outcome. Every pending command
    /// future resolves with [`R2000Error::Closed`] and the inventory stream
    /// ends. Dropping the handle has the same effect.
    pub fn close(&self) {
        if self.is_reading() {
            let _ = self.requests.send(CoreRequest::Write {
                bytes: commands::encode_stop_inventory(),
            });
        }
        let _ = self.requests.send(CoreRequest::Close);
    }

    /// Queue a command and await the frame that resolves its response code.
    async fn execute(&self, bytes: Vec<u8>, response_code: u8) -> Result<Frame, R2000Error> {
        if !self.is_open() {
            return Err(R2000Error::NotConnected);
        }
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(CoreRequest::Command {
                bytes,
                response_code,
                reply,
            })
            .map_err(|_| R2000Error::NotConnected)?;
        rx.await.map_err(|_| R2000Error::Closed)
    }
}

/// Transport pump: the only owner of the transport. Flushes queued writes,
/// then polls for incoming bytes; repeats until asked to stop. Writes queued
/// before a stop request still reach the wire.
fn pump<T: RfidTransport>(
    mut transport: T,
    writes: std::sync::mpsc::Receiver<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    stop: Arc<AtomicBool>,
) {
    if let Err(e) = transport.clear_input() {
        let _ = events.send(TransportEvent::Error(format!("{:?}", e)));
    }
    let mut buf = [0u8; READ_BUF_LEN];
    loop {
        loop {
            match writes.try_recv() {
                Ok(bytes) => {
                    if let Err(e) = transport.write(&bytes) {
                        let _ = events.send(TransportEvent::Error(format!("{:?}", e)));
                    }
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => break,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
            }
        }
        if stop.load(Ordering::Acquire) {
            break;
        }
        match transport.read(&mut buf, READ_POLL_MS) {
            Ok(0) => std::thread::sleep(Duration::from_millis(2)),
            Ok(n) => {
                let _ = events.send(TransportEvent::Data(buf[..n].to_vec()));
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Error(format!("{:?}", e)));
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
    // writes queued before the stop was requested still reach the wire
    while let Ok(bytes) = writes.try_recv() {
        let _ = transport.write(&bytes);
    }
    let _ = events.send(TransportEvent::Closed);
}

/// The connection task: single owner of assembler, router and state.
async fn connection_task(
    mut requests: mpsc::UnboundedReceiver<CoreRequest>,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    writes: std::sync::mpsc::Sender<Vec<u8>>,
    events: broadcast::Sender<ReaderEvent>,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
) {
    let mut assembler = FrameAssembler::new();
    let mut router = ResponseRouter::new();
    let _ = events.send(ReaderEvent::Opened);

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(CoreRequest::Command { mut bytes, response_code, reply }) => {
                    router.register(response_code, reply);
                    checksum::stamp(&mut bytes);
                    debug!("send: {}", bytes_to_hex(&bytes));
                    if writes.send(bytes).is_err() {
                        shutdown(&mut router, &mut assembler, &shared, &events, &stop);
                        break;
                    }
                }
                Some(CoreRequest::StartInventory { mut bytes, reply }) => {
                    let frames = router.subscribe_persistent(commands::RESP_INVENTORY_TAG);
                    checksum::stamp(&mut bytes);
                    debug!("send: {}", bytes_to_hex(&bytes));
                    let sent = writes.send(bytes).is_ok();
                    shared.reading.store(true, Ordering::Relaxed);
                    let _ = events.send(ReaderEvent::Run);
                    let _ = reply.send(frames);
                    if !sent {
                        shutdown(&mut router, &mut assembler, &shared, &events, &stop);
                        break;
                    }
                }
                Some(CoreRequest::Write { mut bytes }) => {
                    checksum::stamp(&mut bytes);
                    debug!("send: {}", bytes_to_hex(&bytes));
                    let _ = writes.send(bytes);
                }
                Some(CoreRequest::Close) | None => {
                    shutdown(&mut router, &mut assembler, &shared, &events, &stop);
                    break;
                }
            },
            event = transport_events.recv() => match event {
                Some(TransportEvent::Data(chunk)) => {
                    for frame in assembler.ingest(&chunk) {
                        debug!("recv: {}", bytes_to_hex(frame.as_bytes()));
                        handle_frame(frame, &mut router, &events, &shared);
                    }
                }
                Some(TransportEvent::Error(message)) => {
                    let _ = events.send(ReaderEvent::Transport(message));
                }
                Some(TransportEvent::Closed) | None => {
                    shutdown(&mut router, &mut assembler, &shared, &events, &stop);
                    break;
                }
            },
        }
    }
}

/// Protocol-level frame handling ahead of subscriber dispatch. Fault and
/// no-tag frames are notifications: they never resolve a pending command.
fn handle_frame(
    frame: Frame,
    router: &mut ResponseRouter,
    events: &broadcast::Sender<ReaderEvent>,
    shared: &Shared,
) {
    match frame.response_code() {
        RESP_ERROR => {
            let fault = DeviceFault::from_code(frame.byte(3));
            let _ = events.send(ReaderEvent::Device(fault));
        }
        RESP_NO_TAG => {
            let _ = events.send(ReaderEvent::Wait);
        }
        code => {
            if code == commands::RESP_STOP_INVENTORY && frame.byte(3) != 0 {
                shared.reading.store(false, Ordering::Relaxed);
            }
            router.dispatch(frame);
        }
    }
}

/// Tear the connection down: cancel every subscriber, drop the partial frame
/// buffer, leave the state machine in Closed and stop the pump.
fn shutdown(
    router: &mut ResponseRouter,
    assembler: &mut FrameAssembler,
    shared: &Shared,
    events: &broadcast::Sender<ReaderEvent>,
    stop: &AtomicBool,
) {
    router.cancel_all();
    assembler.reset();
    shared.connected.store(false, Ordering::Relaxed);
    shared.reading.store(false, Ordering::Relaxed);
    stop.store(true, Ordering::Release);
    let _ = events.send(ReaderEvent::Closed);
}
