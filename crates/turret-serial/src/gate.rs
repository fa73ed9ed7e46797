//! 错误日志门控
//!
//! 重连循环里同一类错误可能每隔几十毫秒出现一次，只在第一次出现
//! 和类别变化时记录，避免日志刷屏。

/// 按类别去重的日志门控
#[derive(Debug, Clone)]
pub struct ErrorLogGate<K> {
    last: Option<K>,
    suppressed: u64,
}

impl<K> Default for ErrorLogGate<K> {
    fn default() -> Self {
        Self {
            last: None,
            suppressed: 0,
        }
    }
}

impl<K: PartialEq + Copy> ErrorLogGate<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 本次错误是否需要记录
    ///
    /// 首次出现或与上一次类别不同时返回 `true`。
    pub fn should_log(&mut self, class: K) -> bool {
        if self.last == Some(class) {
            self.suppressed += 1;
            return false;
        }
        self.last = Some(class);
        self.suppressed = 0;
        true
    }

    /// 恢复正常后清除状态，返回期间被抑制的次数
    pub fn reset(&mut self) -> u64 {
        self.last = None;
        std::mem::take(&mut self.suppressed)
    }

    /// 当前类别下被抑制的次数
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_logged() {
        let mut gate = ErrorLogGate::new();
        assert!(gate.should_log(1u8));
    }

    #[test]
    fn test_repeated_error_suppressed() {
        let mut gate = ErrorLogGate::new();
        assert!(gate.should_log(1u8));
        assert!(!gate.should_log(1u8));
        assert!(!gate.should_log(1u8));
        assert_eq!(gate.suppressed(), 2);
    }

    #[test]
    fn test_kind_transition_logged() {
        let mut gate = ErrorLogGate::new();
        assert!(gate.should_log(1u8));
        assert!(gate.should_log(2u8));
        assert!(gate.should_log(1u8));
        assert_eq!(gate.suppressed(), 0);
    }

    #[test]
    fn test_reset_rearms() {
        let mut gate = ErrorLogGate::new();
        gate.should_log(1u8);
        gate.should_log(1u8);
        assert_eq!(gate.reset(), 1);
        assert!(gate.should_log(1u8));
    }
}
