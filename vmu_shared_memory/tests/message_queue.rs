//! POSIX message queue channel tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use vmu_common::command::{CommandType, EngineCommand, EngineKind, EngineReport};
use vmu_common::config::IpcConfig;
use vmu_common::state::EngineStatus;
use vmu_shared_memory::{
    EngineLink, MessageChannel, MqChannel, ReceiveMode, ShmError, ShmResult,
};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn unique_queue(tag: &str) -> String {
    format!(
        "/vmu_test_{tag}_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

fn request(seq: u32) -> EngineCommand {
    EngineCommand::request(EngineKind::Combustion, CommandType::SetPower, seq, 60.0, 0.4, false)
}

#[test]
fn test_request_reply_roundtrip() -> ShmResult<()> {
    let ipc = IpcConfig::with_suffix(&format!("mq_{}", std::process::id()));
    let supervisor = EngineLink::create(EngineKind::Combustion, &ipc)?;
    let engine = EngineLink::open(EngineKind::Combustion, &ipc)?;

    supervisor.requests.send(&request(5))?;
    let got = engine
        .requests
        .recv_timeout(Duration::from_millis(500))?
        .expect("request delivered");
    assert_eq!(got, request(5));

    let reply = got.reply(
        EngineReport::Combustion {
            fuel: 99.9,
            gear: 3,
            rpm: 2100.0,
            active: true,
            temperature: 25.2,
        },
        EngineStatus::Running,
    );
    engine.responses.send(&reply)?;
    assert_eq!(supervisor.responses.try_recv()?, Some(reply));
    assert_eq!(supervisor.responses.try_recv()?, None);
    Ok(())
}

#[test]
fn test_open_missing_queue() {
    let result = MqChannel::open(&unique_queue("missing"), 256, ReceiveMode::Poll);
    assert!(matches!(result, Err(ShmError::NotFound { .. })));
}

#[test]
fn test_full_queue_reports_channel_full() -> ShmResult<()> {
    let name = unique_queue("full");
    let queue = MqChannel::create(&name, 2, 256)?;
    queue.send(&request(1))?;
    queue.send(&request(2))?;
    assert!(matches!(
        queue.send(&request(3)),
        Err(ShmError::ChannelFull { .. })
    ));
    Ok(())
}

#[test]
fn test_wait_mode_times_out() -> ShmResult<()> {
    let name = unique_queue("wait");
    let _owner = MqChannel::create(&name, 4, 256)?;
    let waiter = MqChannel::open(&name, 256, ReceiveMode::Wait)?;

    let start = Instant::now();
    assert!(waiter.recv_timeout(Duration::from_millis(30))?.is_none());
    assert!(start.elapsed() >= Duration::from_millis(25));

    // try_recv on a waiting descriptor must not block.
    let start = Instant::now();
    assert!(waiter.try_recv()?.is_none());
    assert!(start.elapsed() < Duration::from_millis(25));
    Ok(())
}

#[test]
fn test_undecodable_message_is_skipped() -> ShmResult<()> {
    use nix::mqueue::{MQ_OFlag, mq_open, mq_send};
    use nix::sys::stat::Mode;

    let name = unique_queue("garbage");
    let queue = MqChannel::create(&name, 4, 256)?;

    let raw = mq_open(name.as_str(), MQ_OFlag::O_WRONLY, Mode::empty(), None)?;
    mq_send(&raw, &[0xFF, 0xFF, 0xFF], 0)?;
    queue.send(&request(9))?;

    assert_eq!(queue.try_recv()?.map(|m| m.seq), Some(9));
    assert_eq!(queue.try_recv()?, None);
    nix::mqueue::mq_close(raw)?;
    Ok(())
}
