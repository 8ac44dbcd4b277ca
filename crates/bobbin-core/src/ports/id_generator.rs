//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ExecutionId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は execution id を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（facade は複数タスクから共有される）
pub trait IdGenerator: Send + Sync {
    fn generate_execution_id(&self) -> ExecutionId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時は FixedClock を使うと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_execution_id(&self) -> ExecutionId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ExecutionId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn later_executions_sort_after_earlier_ones() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        let first = UlidGenerator::new(FixedClock::new(earlier)).generate_execution_id();
        let second = UlidGenerator::new(FixedClock::new(later)).generate_execution_id();

        assert!(first < second);
        assert!(first.to_string() < second.to_string());
        assert!(second.to_string().starts_with("exec-"));
    }

    #[test]
    fn system_clock_ids_are_unique() {
        let id_gen = UlidGenerator::new(SystemClock);
        let ids: std::collections::HashSet<ExecutionId> =
            (0..100).map(|_| id_gen.generate_execution_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_is_deterministic() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_execution_id();
        let id2 = id_gen.generate_execution_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }
}
