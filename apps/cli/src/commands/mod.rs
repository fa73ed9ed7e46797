//! 命令定义和实现

pub mod config;
pub mod monitor;
pub mod send;
pub mod solve;

pub use config::ConfigCommand;
pub use monitor::MonitorCommand;
pub use send::SendCommand;
pub use solve::SolveCommand;
