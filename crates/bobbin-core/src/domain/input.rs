//! Task input bounds.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Any value the runner can hand to a work function and persist in a snapshot.
///
/// # Trait Bounds
/// - `Serialize + DeserializeOwned`: snapshot への保存と復元のため
/// - `Clone`: blocking な work function には所有権付きで渡すため
/// - `Send + Sync + 'static`: worker task 間を移動できるため
///
/// Blanket-implemented; there is nothing to implement by hand.
pub trait TaskInput: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> TaskInput for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
