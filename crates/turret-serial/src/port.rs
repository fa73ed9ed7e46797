//! `serialport` 串口适配器
//!
//! 打开即清空系统收发缓冲区（丢弃上一次会话残留的数据）。
//! 分离后 RX/TX 各自持有一个句柄（`try_clone`），出错时各自独立重连。
//!
//! ## 限制
//!
//! - **权限要求**：Linux 下通常需要 `dialout` 组权限
//! - Unix 下关闭独占模式（TIOCEXCL），否则分离后的半边无法各自重新打开同一设备

use crate::{Reopen, RxAdapter, SerialError, SplittableAdapter, TxAdapter};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{trace, warn};

/// 单次读取缓冲区大小
const READ_CHUNK: usize = 256;

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// 串口打开参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl PortSettings {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn open_port(settings: &PortSettings) -> Result<Box<dyn SerialPort>, SerialError> {
    let builder = serialport::new(&settings.path, settings.baud_rate).timeout(settings.timeout);

    #[cfg(unix)]
    let port: Box<dyn SerialPort> = {
        let mut port = builder.open_native()?;
        port.set_exclusive(false)?;
        Box::new(port)
    };
    #[cfg(not(unix))]
    let port = builder.open()?;

    if let Err(e) = port.clear(ClearBuffer::All) {
        warn!("Failed to clear buffers of '{}': {}", settings.path, e);
    }

    trace!(
        "Serial port '{}' opened at {} bps",
        settings.path, settings.baud_rate
    );
    Ok(port)
}

/// 单个方向的端点：参数 + 可选句柄
struct Endpoint {
    settings: PortSettings,
    port: Option<Box<dyn SerialPort>>,
}

impl Endpoint {
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, SerialError> {
        self.port.as_mut().ok_or(SerialError::NotOpen)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            trace!("Serial port '{}' closed", self.settings.path);
        }
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.close();
        self.port = Some(open_port(&self.settings)?);
        Ok(())
    }

    /// 读出当前已缓冲的全部字节（不阻塞）
    fn drain_pending(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        let port = self.port_mut()?;
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let pending = port.bytes_to_read()? as usize;
            if pending == 0 {
                return Ok(total);
            }
            let n = port.read(&mut chunk[..pending.min(READ_CHUNK)])?;
            if n == 0 {
                return Ok(total);
            }
            buf.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        let drained = self.drain_pending(buf)?;
        if drained > 0 {
            return Ok(drained);
        }

        // 无待读数据：阻塞读，最多等待一个读超时
        let port = self.port_mut()?;
        let mut chunk = [0u8; READ_CHUNK];
        let n = match port.read(&mut chunk) {
            Ok(0) => return Err(SerialError::Timeout),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut => return Err(SerialError::Timeout),
            Err(e) => return Err(SerialError::Io(e)),
        };
        buf.extend_from_slice(&chunk[..n]);

        Ok(n + self.drain_pending(buf)?)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        Ok(())
    }
}

/// 串口适配器（未分离）
///
/// # 示例
///
/// ```no_run
/// use turret_serial::{SerialPortAdapter, SplittableAdapter, TxAdapter};
///
/// let adapter = SerialPortAdapter::open("/dev/ttyUSB0", 115_200).unwrap();
/// let (_rx, mut tx) = adapter.split().unwrap();
/// tx.write_all(&[0xF1, 0, 0, 0, 0, 0, 0, 0, 0x00, 0xF2]).unwrap();
/// ```
pub struct SerialPortAdapter {
    endpoint: Endpoint,
}

impl SerialPortAdapter {
    /// 以默认读超时打开串口
    pub fn open(path: impl Into<String>, baud_rate: u32) -> Result<Self, SerialError> {
        Self::open_with(PortSettings::new(path, baud_rate))
    }

    pub fn open_with(settings: PortSettings) -> Result<Self, SerialError> {
        let port = open_port(&settings)?;
        Ok(Self {
            endpoint: Endpoint {
                settings,
                port: Some(port),
            },
        })
    }

    /// 打开后立即关闭一次
    ///
    /// 下位机上电后的第一次会话只输出零值，预热一次后再正式打开。
    pub fn prime(settings: &PortSettings) -> Result<(), SerialError> {
        let port = open_port(settings)?;
        drop(port);
        trace!("Serial port '{}' primed", settings.path);
        Ok(())
    }

    pub fn settings(&self) -> &PortSettings {
        &self.endpoint.settings
    }
}

impl Reopen for SerialPortAdapter {
    fn close(&mut self) {
        self.endpoint.close();
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.endpoint.reopen()
    }
}

impl RxAdapter for SerialPortAdapter {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        self.endpoint.read_available(buf)
    }
}

impl TxAdapter for SerialPortAdapter {
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.endpoint.write_all(data)
    }
}

impl SplittableAdapter for SerialPortAdapter {
    type RxAdapter = SerialRxAdapter;
    type TxAdapter = SerialTxAdapter;

    /// 分离为独立的 RX 和 TX 适配器
    ///
    /// # 错误
    /// - `SerialError::NotOpen`: 适配器已关闭
    /// - `SerialError::Device`: 克隆句柄失败
    fn split(mut self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError> {
        let port = self.endpoint.port.take().ok_or(SerialError::NotOpen)?;
        let rx_port = port.try_clone()?;
        let settings = self.endpoint.settings.clone();

        trace!("Serial port '{}' split into RX and TX", settings.path);

        Ok((
            SerialRxAdapter {
                endpoint: Endpoint {
                    settings: settings.clone(),
                    port: Some(rx_port),
                },
            },
            SerialTxAdapter {
                endpoint: Endpoint {
                    settings,
                    port: Some(port),
                },
            },
        ))
    }
}

/// 分离后的接收端
pub struct SerialRxAdapter {
    endpoint: Endpoint,
}

impl Reopen for SerialRxAdapter {
    fn close(&mut self) {
        self.endpoint.close();
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.endpoint.reopen()
    }
}

impl RxAdapter for SerialRxAdapter {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError> {
        self.endpoint.read_available(buf)
    }
}

/// 分离后的发送端
pub struct SerialTxAdapter {
    endpoint: Endpoint,
}

impl Reopen for SerialTxAdapter {
    fn close(&mut self) {
        self.endpoint.close();
    }

    fn reopen(&mut self) -> Result<(), SerialError> {
        self.endpoint.reopen()
    }
}

impl TxAdapter for SerialTxAdapter {
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.endpoint.write_all(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_settings_defaults() {
        let settings = PortSettings::new("/dev/ttyUSB0", 115_200);
        assert_eq!(settings.path, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.timeout, DEFAULT_READ_TIMEOUT);

        let settings = settings.with_timeout(Duration::from_millis(50));
        assert_eq!(settings.timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_open_missing_device_is_device_error() {
        let result = SerialPortAdapter::open("/dev/turret-test-does-not-exist", 115_200);
        assert!(matches!(result, Err(SerialError::Device(_))));
    }

    #[test]
    fn test_closed_endpoint_reports_not_open() {
        let mut endpoint = Endpoint {
            settings: PortSettings::new("/dev/null-port", 115_200),
            port: None,
        };
        let mut buf = Vec::new();
        assert!(matches!(
            endpoint.read_available(&mut buf),
            Err(SerialError::NotOpen)
        ));
        assert!(matches!(endpoint.write_all(&[1]), Err(SerialError::NotOpen)));
        endpoint.close();
    }
}
