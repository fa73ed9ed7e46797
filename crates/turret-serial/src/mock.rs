//! Mock 串口适配器
//!
//! 基于内存通道，用于无硬件测试：向接收端注入字节块或设备错误，
//! 从发送端取出写入的帧，并统计重连次数。

use crate::{
    Reopen, RxAdapter, SerialDeviceError, SerialDeviceErrorKind, SerialError, SplittableAdapter,
    TxAdapter,
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// 接收端事件
#[derive(Debug, Clone)]
enum RxEvent {
    Data(Vec<u8>),
    Fail(SerialDeviceErrorKind),
}

#[derive(Debug, Default)]
struct Counters {
    rx_reopens: AtomicUsize,
    tx_reopens: AtomicUsize,
    /// 接下来若干次 reopen 失败
    failing_reopens: AtomicUsize,
    /// 接下来若干次 write 失败
    failing_writes: AtomicUsize,
    rx_open: AtomicBool,
    tx_open: AtomicBool,
}

/// 测试侧控制句柄
#[derive(Clone)]
pub struct MockLink {
    rx_events: Sender<RxEvent>,
    written: Receiver<Vec<u8>>,
    counters: Arc<Counters>,
}

impl MockLink {
    /// 注入一次读取结果（一次 `read_available` 返回整块）
    pub fn feed(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.rx_events.send(RxEvent::Data(bytes.into()));
    }

    /// 注入一次设备错误（下一次读取返回）
    pub fn inject_read_error(&self, kind: SerialDeviceErrorKind) {
        let _ = self.rx_events.send(RxEvent::Fail(kind));
    }

    /// 接下来 `count` 次 reopen 失败（RX/TX 共享计数）
    pub fn fail_next_reopens(&self, count: usize) {
        self.counters.failing_reopens.store(count, Ordering::SeqCst);
    }

    /// 接下来 `count` 次写入失败
    pub fn fail_next_writes(&self, count: usize) {
        self.counters.failing_writes.store(count, Ordering::SeqCst);
    }

    /// 已写入的数据（按写入顺序）
    pub fn written(&self) -> &Receiver<Vec<u8>> {
        &self.written
    }

    pub fn rx_reopens(&self) -> usize {
        self.counters.rx_reopens.load(Ordering::SeqCst)
    }

    pub fn tx_reopens(&self) -> usize {
        self.counters.tx_reopens.load(Ordering::SeqCst)
    }

    pub fn is_rx_open(&self) -> bool {
        self.counters.rx_open.load(Ordering::SeqCst)
    }

    pub fn is_tx_open(&self) -> bool {
        self.counters.tx_open.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Mock 适配器（未分离）
pub struct MockSerialAdapter {
    rx: MockRxAdapter,
    tx: MockTxAdapter,
}

impl MockSerialAdapter {
    /// 创建适配器和控制句柄
    ///
    /// `read_timeout`: 无数据时 `read_available` 的等待时间
    pub fn new(read_timeout: Duration) -> (Self, MockLink) {
        let (event_tx, event_rx) = unbounded();
        let (written_tx, written_rx) = unbounded();
        let counters = Arc::new(Counters::default());
        counters.rx_open.store(true, Ordering::SeqCst);
        counters.tx_open.store(true, Ordering::SeqCst);

        let adapter = Self {
            rx: MockRxAdapter {
                events: event_rx,
                timeout: read_timeout,
                open: true,
                counters: counters.clone(),
            },
            tx: MockTxAdapter {
                written: written_tx,
                open: true,
                counters: counters.clone(),
            },
        };
        let link = MockLink {
            rx_events: event_tx,
            written: written_rx,
            counters,
        };
        (adapter, link)
    }
}

impl SplittableAdapter for MockSerialAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError> {
        Ok((self.rx, self.tx))
    }
}

/// Mock 接收端
pub struct MockRxAdapter {
    events: Receiver<RxEvent>,
    timeout: Duration,
    open: bool,
    counters: Arc<Counters>,
}

impl Reopen for MockRxAdapter {
    fn close(&mut self) {
        self.open = false;
        self.counters.rx_open.store(false, Ordering::SeqCst);
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.close();
        self.counters.rx_reopens.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.counters.failing_reopens) {
            return Err(SerialDeviceError::new(SerialDeviceErrorKind::NoDevice, "mock reopen failure").into());
        }
        self.open = true;
        self.counters.rx_open.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl RxAdapter for MockRxAdapter {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        if !self.open {
            return Err(SerialError::NotOpen);
        }
        match self.events.recv_timeout(self.timeout) {
            Ok(RxEvent::Data(bytes)) => {
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            },
            Ok(RxEvent::Fail(kind)) => {
                Err(SerialDeviceError::new(kind, "mock injected read failure").into())
            },
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(SerialError::Timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                // 控制句柄已释放：表现为持续超时
                std::thread::sleep(self.timeout);
                Err(SerialError::Timeout)
            },
        }
    }
}

/// Mock 发送端
pub struct MockTxAdapter {
    written: Sender<Vec<u8>>,
    open: bool,
    counters: Arc<Counters>,
}

impl Reopen for MockTxAdapter {
    fn close(&mut self) {
        self.open = false;
        self.counters.tx_open.store(false, Ordering::SeqCst);
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.close();
        self.counters.tx_reopens.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.counters.failing_reopens) {
            return Err(SerialDeviceError::new(SerialDeviceErrorKind::NoDevice, "mock reopen failure").into());
        }
        self.open = true;
        self.counters.tx_open.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl TxAdapter for MockTxAdapter {
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        if !self.open {
            return Err(SerialError::NotOpen);
        }
        if take_one(&self.counters.failing_writes) {
            return Err(SerialDeviceError::new(SerialDeviceErrorKind::Io, "mock write failure").into());
        }
        let _ = self.written.send(data.to_vec());
        Ok(())
    }
}
