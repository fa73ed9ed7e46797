//! Builder 模式实现
//!
//! 提供链式构造 `Turret` 实例的便捷方式。

use crate::camera::Camera;
use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use crate::turret::Turret;
use std::time::Duration;
use tracing::info;
use turret_serial::port::PortSettings;
use turret_serial::{DEFAULT_BAUD_RATE, SerialPortAdapter, SplittableAdapter};

/// Turret Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use turret_driver::{PipelineConfig, TurretBuilder};
///
/// let config = PipelineConfig {
///     reconnect_interval_ms: 200,
///     ..PipelineConfig::default()
/// };
/// let turret = TurretBuilder::new()
///     .port("/dev/ttyUSB0")
///     .pipeline_config(config)
///     .build()
///     .unwrap();
/// ```
pub struct TurretBuilder {
    /// 串口设备路径
    port: Option<String>,
    /// 波特率（默认 115200）
    baud_rate: u32,
    /// Pipeline 配置
    pipeline_config: PipelineConfig,
    camera: Option<Box<dyn Camera + Send>>,
    /// 启动前先打开并关闭一次串口
    prime: bool,
}

impl Default for TurretBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TurretBuilder {
    pub fn new() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            pipeline_config: PipelineConfig::default(),
            camera: None,
            prime: true,
        }
    }

    /// 设置串口设备路径（必填）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 设置串口读超时（写入 `PipelineConfig::receive_timeout_ms`）
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.receive_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 设置 Pipeline 配置（可选）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// 设置相机（可选，不设置则只运行串口链路）
    pub fn camera(mut self, camera: impl Camera + Send + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    /// 是否在启动前预热串口（默认开启）
    pub fn prime(mut self, prime: bool) -> Self {
        self.prime = prime;
        self
    }

    /// 打开串口并启动工作线程
    ///
    /// # 错误
    /// - `DriverError::InvalidInput`: 未设置串口路径
    /// - `DriverError::Serial`: 打开串口失败
    pub fn build(self) -> Result<Turret, DriverError> {
        let path = self
            .port
            .clone()
            .ok_or_else(|| DriverError::InvalidInput("serial port path is not set".to_string()))?;

        let settings = PortSettings::new(path, self.baud_rate)
            .with_timeout(Duration::from_millis(self.pipeline_config.receive_timeout_ms));

        if self.prime {
            SerialPortAdapter::prime(&settings)?;
        }
        let adapter = SerialPortAdapter::open_with(settings)?;
        info!(
            "Serial port '{}' opened at {} bps",
            adapter.settings().path,
            adapter.settings().baud_rate
        );

        self.build_with_adapter(adapter)
    }

    /// 使用已打开的适配器启动（测试或自定义传输）
    pub fn build_with_adapter<A>(self, adapter: A) -> Result<Turret, DriverError>
    where
        A: SplittableAdapter,
        A::RxAdapter: Send + 'static,
        A::TxAdapter: Send + 'static,
    {
        Turret::new(adapter, self.camera, self.pipeline_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turret_serial::mock::MockSerialAdapter;

    #[test]
    fn test_builder_defaults() {
        let builder = TurretBuilder::new();
        assert_eq!(builder.baud_rate, 115_200);
        assert!(builder.prime);
        assert!(builder.port.is_none());
        assert_eq!(builder.pipeline_config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_chain() {
        let builder = TurretBuilder::new()
            .port("/dev/ttyACM0")
            .baud_rate(921_600)
            .read_timeout(Duration::from_millis(5))
            .prime(false);
        assert_eq!(builder.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(builder.baud_rate, 921_600);
        assert_eq!(builder.pipeline_config.receive_timeout_ms, 5);
        assert!(!builder.prime);
    }

    #[test]
    fn test_build_without_port_fails() {
        let result = TurretBuilder::new().build();
        assert!(matches!(result, Err(DriverError::InvalidInput(_))));
    }

    #[test]
    fn test_build_with_mock_adapter() {
        let (adapter, _link) = MockSerialAdapter::new(Duration::from_millis(2));
        let turret = TurretBuilder::new().build_with_adapter(adapter).unwrap();
        assert!(turret.is_healthy());
    }
}
