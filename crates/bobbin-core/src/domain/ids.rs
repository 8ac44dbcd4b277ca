//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! Execution は ULID (Universally Unique Lexicographically Sortable Identifier) で識別します。
//! 時刻でソートできるので、store ディレクトリを `ls` するだけで実行順に並びます。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供し、`T` はコンパイル時にだけ使うマーカー型です。
//! Worker は execution 内のローカルな番号なので ULID ではなく `WorkerId(u32)` を使います。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// Marker trait providing the display prefix of an id type.
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "exec-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// Serialized as the bare ULID string; the prefix only appears in `Display`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Error returned when an id string is neither `<prefix><ULID>` nor a bare ULID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id {input:?}: {reason}")]
pub struct ParseIdError {
    pub input: String,
    pub reason: String,
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    /// Accepts both the `Display` form and the bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|e| ParseIdError {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Execution のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Execution {}

impl IdMarker for Execution {
    fn prefix() -> &'static str {
        "exec-"
    }
}

/// Identifier of an Execution (one run of a work function over an input collection).
pub type ExecutionId = Id<Execution>;

/// Label of a shard inside one execution.
///
/// `0` holds inputs that were already finished before the run started and is never
/// assigned a live worker. Live shards are numbered from `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u32);

impl WorkerId {
    /// Shard holding previously finished inputs.
    pub const FINISHED: WorkerId = WorkerId(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn is_finished_shard(self) -> bool {
        self == Self::FINISHED
    }

    /// Ids of the live shards `1..=count`.
    ///
    /// At most `u32::MAX` ids exist; a larger `count` yields all of them.
    pub fn live(count: usize) -> impl Iterator<Item = WorkerId> {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        (1..=count).map(WorkerId)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(WorkerId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_displays_with_prefix() {
        let ulid = Ulid::new();
        let id = ExecutionId::from_ulid(ulid);

        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("exec-{ulid}"));
    }

    #[test]
    fn execution_id_parses_prefixed_and_bare_forms() {
        let id = ExecutionId::from_ulid(Ulid::new());

        let prefixed: ExecutionId = id.to_string().parse().unwrap();
        let bare: ExecutionId = id.as_ulid().to_string().parse().unwrap();

        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
    }

    #[test]
    fn execution_id_rejects_garbage() {
        let err = "exec-not-a-ulid".parse::<ExecutionId>().unwrap_err();
        assert_eq!(err.input, "exec-not-a-ulid");
    }

    #[test]
    fn execution_id_serializes_as_plain_string() {
        let id = ExecutionId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", id.as_ulid()));

        let deserialized: ExecutionId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn live_worker_ids_start_after_finished_shard() {
        let ids: Vec<u32> = WorkerId::live(3).map(WorkerId::get).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(WorkerId::FINISHED.is_finished_shard());
        assert!(!WorkerId::new(1).is_finished_shard());
    }

    #[test]
    fn live_worker_ids_never_wrap_around() {
        let last = WorkerId::live(usize::MAX).take(3).last();
        assert_eq!(last, Some(WorkerId::new(3)));
        assert_eq!(WorkerId::live(0).count(), 0);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            WorkerId::live(u32::MAX as usize + 1).next(),
            Some(WorkerId::new(1))
        );
    }

    #[test]
    fn worker_id_round_trips_through_str() {
        let id: WorkerId = "7".parse().unwrap();
        assert_eq!(id, WorkerId::new(7));
        assert_eq!(id.to_string(), "7");
        assert!("meta".parse::<WorkerId>().is_err());
    }
}
