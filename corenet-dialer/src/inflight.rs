//! Deduplicates concurrent dials to the same peer (SPEC §9 "In-flight-dial
//! table"): the first caller to ask for a given NodeID actually runs the
//! dial; every concurrent caller for the same NodeID awaits the same result.

use crate::{DialOutcome, DialerConnection, DialerError};
use corenet_identity::NodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Default)]
pub struct InFlightTable {
    inner: Mutex<HashMap<NodeId, Arc<OnceCell<DialOutcome>>>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        InFlightTable::default()
    }

    /// Runs `dial` for `target` if no dial is already in flight; otherwise
    /// awaits the in-flight attempt's result. The slot is cleared once the
    /// dial completes so a later, independent dial can be attempted fresh.
    pub async fn dial_once<F, Fut>(&self, target: NodeId, dial: F) -> DialOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DialerConnection, DialerError>>,
    {
        let cell = {
            let mut table = self.inner.lock();
            table.entry(target).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let outcome = cell.get_or_init(dial).await.clone();

        let mut table = self.inner.lock();
        if let Some(existing) = table.get(&target) {
            if Arc::ptr_eq(existing, &cell) {
                table.remove(&target);
            }
        }

        outcome
    }
}
