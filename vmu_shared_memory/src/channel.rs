//! Engine message channels.
//!
//! Each engine has two one-way queues: requests (supervisor → engine) and
//! responses (engine → supervisor). Messages are [`EngineCommand`]s encoded
//! with bincode. A message that fails to decode is logged and skipped.

use crate::error::{ShmError, ShmResult};
use nix::errno::Errno;
use nix::mqueue::{
    MQ_OFlag, MqAttr, MqdT, mq_close, mq_open, mq_receive, mq_send, mq_timedreceive, mq_unlink,
};
use nix::sys::stat::Mode;
use nix::sys::time::TimeSpec;
use nix::time::{ClockId, clock_gettime};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use vmu_common::command::{EngineCommand, EngineKind};
use vmu_common::config::IpcConfig;

/// Largest message size a queue may be configured with.
pub const MAX_MESSAGE_SIZE: usize = 8192;

/// One-way message queue carrying engine commands.
pub trait MessageChannel: Send + Sync {
    /// Queue name, for logs.
    fn name(&self) -> &str;

    /// Enqueue without blocking. A full queue yields `ChannelFull`.
    fn send(&self, msg: &EngineCommand) -> ShmResult<()>;

    /// Dequeue without blocking.
    fn try_recv(&self) -> ShmResult<Option<EngineCommand>>;

    /// Dequeue, waiting at most `timeout`.
    fn recv_timeout(&self, timeout: Duration) -> ShmResult<Option<EngineCommand>>;
}

/// Encode a message, checking it fits `limit` bytes.
pub fn encode(msg: &EngineCommand, limit: usize) -> ShmResult<Vec<u8>> {
    let bytes = bincode::serialize(msg)?;
    if bytes.len() > limit {
        return Err(ShmError::MessageTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(bytes)
}

/// Decode a message.
pub fn decode(bytes: &[u8]) -> ShmResult<EngineCommand> {
    Ok(bincode::deserialize(bytes)?)
}

// ─── POSIX message queue ────────────────────────────────────────────

/// How receives behave on an [`MqChannel`] descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveMode {
    /// Non-blocking descriptor; `recv_timeout` does not wait.
    Poll,
    /// Blocking descriptor; receives wait with a deadline.
    Wait,
}

/// POSIX message queue endpoint.
pub struct MqChannel {
    name: String,
    mqd: Option<MqdT>,
    mode: ReceiveMode,
    message_size: usize,
    owner: bool,
}

impl MqChannel {
    /// Create the queue, replacing any leftover with the same name.
    ///
    /// The creator's descriptor is non-blocking.
    pub fn create(name: &str, depth: usize, message_size: usize) -> ShmResult<Self> {
        Self::check_size(message_size)?;
        match mq_unlink(name) {
            Ok(()) => warn!("Removed stale queue {name}"),
            Err(Errno::ENOENT) => {}
            Err(Errno::EINVAL) | Err(Errno::ENAMETOOLONG) => {
                return Err(ShmError::InvalidName {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let attr = MqAttr::new(0, depth as _, message_size as _, 0);
        let flags =
            MQ_OFlag::O_CREAT | MQ_OFlag::O_EXCL | MQ_OFlag::O_RDWR | MQ_OFlag::O_NONBLOCK;
        let mqd = mq_open(name, flags, Mode::S_IRUSR | Mode::S_IWUSR, Some(&attr))?;
        debug!("Created queue {name} (depth={depth}, msg={message_size}B)");
        Ok(Self {
            name: name.to_string(),
            mqd: Some(mqd),
            mode: ReceiveMode::Poll,
            message_size,
            owner: true,
        })
    }

    /// Open a queue created by another process.
    pub fn open(name: &str, message_size: usize, mode: ReceiveMode) -> ShmResult<Self> {
        Self::check_size(message_size)?;
        let mut flags = MQ_OFlag::O_RDWR;
        if mode == ReceiveMode::Poll {
            flags |= MQ_OFlag::O_NONBLOCK;
        }
        let mqd = mq_open(name, flags, Mode::empty(), None).map_err(|e| match e {
            Errno::ENOENT => ShmError::NotFound {
                name: name.to_string(),
            },
            e => ShmError::Nix { source: e },
        })?;
        Ok(Self {
            name: name.to_string(),
            mqd: Some(mqd),
            mode,
            message_size,
            owner: false,
        })
    }

    fn check_size(message_size: usize) -> ShmResult<()> {
        if message_size == 0 || message_size > MAX_MESSAGE_SIZE {
            return Err(ShmError::MessageTooLarge {
                size: message_size,
                limit: MAX_MESSAGE_SIZE,
            });
        }
        Ok(())
    }

    fn descriptor(&self) -> ShmResult<&MqdT> {
        self.mqd.as_ref().ok_or_else(|| ShmError::NotFound {
            name: self.name.clone(),
        })
    }

    /// Receive one raw message. `None` when nothing arrived before `deadline`.
    fn receive_raw(&self, buf: &mut [u8], deadline: Option<Duration>) -> ShmResult<Option<usize>> {
        let mqd = self.descriptor()?;
        let mut priority = 0u32;
        let result = match (self.mode, deadline) {
            (ReceiveMode::Wait, Some(timeout)) => {
                let abstime =
                    clock_gettime(ClockId::CLOCK_REALTIME)? + TimeSpec::from_duration(timeout);
                mq_timedreceive(mqd, buf, &mut priority, &abstime)
            }
            (ReceiveMode::Wait, None) => {
                let now = clock_gettime(ClockId::CLOCK_REALTIME)?;
                mq_timedreceive(mqd, buf, &mut priority, &now)
            }
            (ReceiveMode::Poll, _) => mq_receive(mqd, buf, &mut priority),
        };
        match result {
            Ok(len) => Ok(Some(len)),
            Err(Errno::EAGAIN) | Err(Errno::ETIMEDOUT) | Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn receive(&self, mut deadline: Option<Duration>) -> ShmResult<Option<EngineCommand>> {
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        let buf = &mut buf[..self.message_size];
        loop {
            let Some(len) = self.receive_raw(buf, deadline)? else {
                return Ok(None);
            };
            match decode(&buf[..len]) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    // Skip it; only look for an already queued successor.
                    debug!("Dropping undecodable message on {}: {e}", self.name);
                    deadline = None;
                }
            }
        }
    }
}

impl MessageChannel for MqChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, msg: &EngineCommand) -> ShmResult<()> {
        let bytes = encode(msg, self.message_size)?;
        match mq_send(self.descriptor()?, &bytes, 0) {
            Ok(()) => Ok(()),
            Err(Errno::EAGAIN) => Err(ShmError::ChannelFull {
                name: self.name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn try_recv(&self) -> ShmResult<Option<EngineCommand>> {
        self.receive(None)
    }

    fn recv_timeout(&self, timeout: Duration) -> ShmResult<Option<EngineCommand>> {
        self.receive(Some(timeout))
    }
}

impl Drop for MqChannel {
    fn drop(&mut self) {
        if let Some(mqd) = self.mqd.take() {
            if let Err(e) = mq_close(mqd) {
                warn!("mq_close({}) failed: {e}", self.name);
            }
        }
        if self.owner {
            if let Err(e) = mq_unlink(self.name.as_str()) {
                warn!("mq_unlink({}) failed: {e}", self.name);
            }
        }
    }
}

// ─── In-process queue ───────────────────────────────────────────────

struct MemoryQueue {
    name: String,
    capacity: usize,
    messages: Mutex<VecDeque<EngineCommand>>,
    ready: Condvar,
}

/// Bounded in-process queue with the same semantics. Clones share the queue.
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<MemoryQueue>,
}

impl MemoryChannel {
    pub fn new(name: &str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(MemoryQueue {
                name: name.to_string(),
                capacity,
                messages: Mutex::new(VecDeque::with_capacity(capacity)),
                ready: Condvar::new(),
            }),
        }
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.inner.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn send(&self, msg: &EngineCommand) -> ShmResult<()> {
        let mut messages = self.inner.messages.lock();
        if messages.len() >= self.inner.capacity {
            return Err(ShmError::ChannelFull {
                name: self.inner.name.clone(),
            });
        }
        messages.push_back(*msg);
        self.inner.ready.notify_one();
        Ok(())
    }

    fn try_recv(&self) -> ShmResult<Option<EngineCommand>> {
        Ok(self.inner.messages.lock().pop_front())
    }

    fn recv_timeout(&self, timeout: Duration) -> ShmResult<Option<EngineCommand>> {
        let mut messages = self.inner.messages.lock();
        if messages.is_empty() {
            let _ = self.inner.ready.wait_for(&mut messages, timeout);
        }
        Ok(messages.pop_front())
    }
}

// ─── Engine link ────────────────────────────────────────────────────

/// Request and response queues of one engine.
pub struct EngineLink<C> {
    pub kind: EngineKind,
    pub requests: C,
    pub responses: C,
}

fn queue_names(kind: EngineKind, ipc: &IpcConfig) -> (&str, &str) {
    match kind {
        EngineKind::Electric => (&ipc.ev_requests, &ipc.ev_responses),
        EngineKind::Combustion => (&ipc.iec_requests, &ipc.iec_responses),
    }
}

impl EngineLink<MqChannel> {
    /// Supervisor side: create both queues.
    pub fn create(kind: EngineKind, ipc: &IpcConfig) -> ShmResult<Self> {
        let (req, rsp) = queue_names(kind, ipc);
        Ok(Self {
            kind,
            requests: MqChannel::create(req, ipc.queue_depth, ipc.message_size)?,
            responses: MqChannel::create(rsp, ipc.queue_depth, ipc.message_size)?,
        })
    }

    /// Engine side: wait on requests, never block on responses.
    pub fn open(kind: EngineKind, ipc: &IpcConfig) -> ShmResult<Self> {
        let (req, rsp) = queue_names(kind, ipc);
        Ok(Self {
            kind,
            requests: MqChannel::open(req, ipc.message_size, ReceiveMode::Wait)?,
            responses: MqChannel::open(rsp, ipc.message_size, ReceiveMode::Poll)?,
        })
    }
}

impl EngineLink<MemoryChannel> {
    /// In-process link. Both ends use clones of the returned value.
    pub fn memory(kind: EngineKind, capacity: usize) -> Self {
        Self {
            kind,
            requests: MemoryChannel::new(&format!("{kind}-requests"), capacity),
            responses: MemoryChannel::new(&format!("{kind}-responses"), capacity),
        }
    }
}

impl Clone for EngineLink<MemoryChannel> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            requests: self.requests.clone(),
            responses: self.responses.clone(),
        }
    }
}
