//! # Clock（時刻プロバイダ）
//!
//! ワークフロー遷移やリマインダー判定が参照する「現在時刻」を抽象化する。
//! リマインダーのしきい値（開始 72 時間前 / 24 時間前、終了後 24 時間）は
//! 時刻に強く依存するため、テストでは固定時刻または手動で進める時刻を注入する。

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 実際のシステム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻を返すテスト用実装
///
/// `advance()` で時刻を進められる。定期スイープを複数回走らせるテストで使う。
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 保持している時刻を `delta` だけ進める
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_system_clock_は現在時刻を返す() {
        let before = Utc::now();
        let result = SystemClock.now();
        let after = Utc::now();

        assert!(result >= before && result <= after);
    }

    #[test]
    fn test_fixed_clock_はadvanceするまで同じ時刻を返す() {
        let fixed = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = FixedClock::new(fixed);

        assert_eq!(clock.now(), fixed);
        assert_eq!(clock.now(), fixed);
    }

    #[test]
    fn test_fixed_clock_のadvanceで時刻が進む() {
        let fixed = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = FixedClock::new(fixed);

        clock.advance(Duration::hours(12));

        assert_eq!(clock.now(), fixed + Duration::hours(12));
    }
}
