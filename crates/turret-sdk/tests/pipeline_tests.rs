//! 串口链路端到端集成测试
//!
//! 使用 MockSerialAdapter 注入字节流和设备错误，验证
//! RX 线程解码 → 状态历史 → 姿态插值，以及重连和命令下发的完整流程。

use approx::assert_relative_eq;
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use turret_sdk::driver::pipeline::process_read;
use turret_sdk::driver::{
    CommandMailbox, PipelineConfig, StatusHistory, Turret, TurretMetrics, orientation_at,
};
use turret_sdk::protocol::{AimCommand, FireFlag, Status, encode, encode_status};
use turret_sdk::serial::SerialDeviceErrorKind;
use turret_sdk::serial::mock::{MockLink, MockSerialAdapter};

fn status_frame(stamp: u8, yaw: f64) -> Vec<u8> {
    encode_status(&Status {
        stamp,
        yaw_degree: yaw,
        pitch_degree: 1.5,
        bullet_speed: 15.0,
        flag: 3,
    })
    .to_vec()
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        update_timeout_ms: 1_000,
        orientation_timeout_ms: 1_000,
        reconnect_interval_ms: 1,
        ..PipelineConfig::default()
    }
}

fn serial_turret() -> (Turret, MockLink) {
    let (adapter, link) = MockSerialAdapter::new(Duration::from_millis(2));
    let turret = Turret::new(adapter, None, test_config()).unwrap();
    (turret, link)
}

#[test]
fn test_orientation_interpolated_between_frames() {
    let history = StatusHistory::new(100, Duration::from_secs(2));
    let metrics = TurretMetrics::new();

    assert!(process_read(&status_frame(1, 0.0), 0, &history, &metrics).is_some());
    assert!(process_read(&status_frame(2, 10.0), 10_000, &history, &metrics).is_some());

    let o = orientation_at(&history, 5_000, Duration::from_millis(10)).unwrap();
    assert_relative_eq!(o.yaw_degree, 5.0, epsilon = 1e-6);
    assert_relative_eq!(o.pitch_degree, 1.5, epsilon = 1e-6);
    assert_eq!(metrics.snapshot().rx_frames_valid, 2);
}

#[test]
fn test_rx_worker_timestamps_drive_interpolation() {
    let (turret, link) = serial_turret();

    link.feed(status_frame(1, 0.0));
    let first = turret.wait_status(None, Duration::from_secs(2)).unwrap();
    thread::sleep(Duration::from_millis(5));
    link.feed(status_frame(2, 10.0));
    let second = turret
        .wait_status(Some(first.read_time_us), Duration::from_secs(2))
        .unwrap();
    assert_eq!(second.status.stamp, 2);

    // 接收时间由 RX 线程打点，查询两者中点
    let span = second.read_time_us - first.read_time_us;
    assert!(span >= 5_000);
    let mid = first.read_time_us + span / 2;
    let expected = 10.0 * (mid - first.read_time_us) as f64 / span as f64;

    let o = turret.orientation_at(mid).unwrap();
    assert_relative_eq!(o.yaw_degree, expected, epsilon = 1e-6);
    assert_relative_eq!(o.pitch_degree, 1.5, epsilon = 1e-6);

    let o = turret.orientation_at(second.read_time_us).unwrap();
    assert_relative_eq!(o.yaw_degree, 10.0, epsilon = 1e-6);
    assert_eq!(turret.metrics().rx_frames_valid, 2);
}

#[test]
fn test_orientation_wraps_across_180() {
    let history = StatusHistory::new(100, Duration::from_secs(2));
    let metrics = TurretMetrics::new();

    process_read(&status_frame(1, 179.0), 1_000, &history, &metrics);
    process_read(&status_frame(2, -179.0), 3_000, &history, &metrics);

    let o = orientation_at(&history, 2_000, Duration::from_millis(10)).unwrap();
    assert_relative_eq!(o.yaw_degree.abs(), 180.0, epsilon = 1e-6);
}

#[test]
fn test_orientation_before_first_sample_uses_first() {
    let history = StatusHistory::new(100, Duration::from_secs(2));
    let metrics = TurretMetrics::new();
    process_read(&status_frame(1, 42.0), 50_000, &history, &metrics);

    let o = orientation_at(&history, 10_000, Duration::from_millis(10)).unwrap();
    assert_relative_eq!(o.yaw_degree, 42.0, epsilon = 1e-6);
}

#[test]
fn test_rx_resync_on_garbage_and_concatenated_reads() {
    let (turret, link) = serial_turret();

    // 垃圾前缀 + 完整帧
    let mut chunk = vec![0x00, 0xF2, 0x13, 0x37];
    chunk.extend(status_frame(7, 12.0));
    link.feed(chunk);
    let first = turret.wait_status(None, Duration::from_secs(2)).unwrap();
    assert_eq!(first.status.stamp, 7);

    // 两帧拼接：只取最后一帧
    let mut chunk = status_frame(8, 20.0);
    chunk.extend(status_frame(9, 30.0));
    link.feed(chunk);
    let second = turret
        .wait_status(Some(first.read_time_us), Duration::from_secs(2))
        .unwrap();
    assert_eq!(second.status.stamp, 9);
    assert_relative_eq!(second.status.yaw_degree, 30.0, epsilon = 1e-6);

    // 损坏的帧被丢弃并计数
    let mut corrupted = status_frame(10, 40.0);
    corrupted[3] ^= 0x01;
    link.feed(corrupted);
    link.feed(vec![0xF1, 0x00]);
    link.feed(status_frame(11, 50.0));
    let third = turret
        .wait_status(Some(second.read_time_us), Duration::from_secs(2))
        .unwrap();
    assert_eq!(third.status.stamp, 11);

    let metrics = turret.metrics();
    assert_eq!(metrics.rx_bad_checksum, 1);
    assert_eq!(metrics.rx_short_reads, 1);
    assert_eq!(metrics.rx_frames_valid, 3);
}

#[test]
fn test_rx_reconnects_after_device_error() {
    let (turret, link) = serial_turret();

    link.fail_next_reopens(2);
    link.inject_read_error(SerialDeviceErrorKind::Io);
    link.feed(status_frame(1, 5.0));

    let sample = turret.wait_status(None, Duration::from_secs(2)).unwrap();
    assert_eq!(sample.status.stamp, 1);
    // 两次失败 + 一次成功
    assert_eq!(link.rx_reopens(), 3);
    assert!(link.is_rx_open());

    let metrics = turret.metrics();
    assert!(metrics.device_errors >= 1);
    assert!(metrics.reconnects >= 1);
    assert!(turret.is_healthy());
}

#[test]
fn test_mailbox_keeps_latest_command() {
    let mailbox = CommandMailbox::default();
    assert!(!mailbox.post(AimCommand::new(1.0, 0.0, 1000.0, FireFlag::Idle)));
    assert!(mailbox.post(AimCommand::new(2.0, 0.0, 2000.0, FireFlag::Fire)));

    let command = mailbox.take().unwrap();
    assert_eq!(command.x_mm, 2);
    assert_eq!(command.z_mm, 2000);
    assert!(mailbox.take().is_none());
}

#[test]
fn test_tx_delivers_latest_command() {
    let (turret, link) = serial_turret();

    for i in 1..=100 {
        turret
            .send_command(AimCommand::new(i as f64, 0.0, 3000.0, FireFlag::Idle))
            .unwrap();
    }

    let mut last = None;
    while let Ok(frame) = link.written().recv_timeout(Duration::from_millis(200)) {
        last = Some(AimCommand::from_frame(&frame).unwrap());
        if last.is_some_and(|c| c.x_mm == 100) {
            break;
        }
    }
    assert_eq!(last.map(|c| c.x_mm), Some(100));

    let metrics = turret.metrics();
    assert_eq!(metrics.tx_commands_total, 100);
    assert!(metrics.tx_frames_sent <= 100);
}

#[test]
fn test_shoot_frame_bytes() {
    let (turret, link) = serial_turret();
    turret
        .shoot(0.0, 0.0, &Vector3::new(0.0, 0.0, 5.0), Some(0.0))
        .unwrap();

    let written = link.written().recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(
        hex::encode(&written),
        hex::encode(encode(0.0, 0.0, 5000.0, FireFlag::Fire))
    );
    assert_eq!(written[0], 0xF1);
    assert_eq!(written[9], 0xF2);
}

#[test]
fn test_status_feeder_thread() {
    let (turret, link) = serial_turret();
    let stop = Arc::new(AtomicBool::new(false));

    let feeder = {
        let stop = stop.clone();
        let link = link.clone();
        thread::spawn(move || {
            let mut count = 0u32;
            while !stop.load(Ordering::Acquire) {
                count += 1;
                link.feed(status_frame(count as u8, count as f64 / 100.0));
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let first = turret.wait_status(None, Duration::from_secs(2)).unwrap();
    let later = turret
        .wait_status(Some(first.read_time_us + 10_000), Duration::from_secs(2))
        .unwrap();
    stop.store(true, Ordering::Release);
    feeder.join().unwrap();

    assert!(later.read_time_us > first.read_time_us);
    let o = turret.orientation_at(first.read_time_us + 5_000).unwrap();
    assert!(o.yaw_degree >= first.status.yaw_degree);
    assert!(o.yaw_degree <= later.status.yaw_degree);
}
