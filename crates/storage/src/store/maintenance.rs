#![forbid(unsafe_code)]

use super::closure::{clear_closure_tx, closure_entries_tx, rebuild_subtree_tx};
use super::nodes::{location_count_tx, parent_pointers_tx, root_ids_tx};
use super::{SqliteStore, StoreError};
use loc_core::closure::{ClosureDrift, derive_closure};
use loc_core::location::ClosureEntry;
use std::sync::atomic::AtomicBool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    pub nodes: usize,
    pub entries: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosureReport {
    pub nodes: usize,
    pub entries: usize,
    pub missing: Vec<ClosureEntry>,
    pub stale: Vec<ClosureEntry>,
}

impl ClosureReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

impl SqliteStore {
    /// Throws the closure index away and derives it again from parent pointers.
    ///
    /// Runs in one write transaction. If `cancel` is raised between two nodes the transaction
    /// is rolled back, the previous closure stays in place, and the rebuild can be rerun.
    pub fn rebuild_closure(&mut self, cancel: &AtomicBool) -> Result<RebuildReport, StoreError> {
        self.rebuild_closure_with_progress(cancel, |_| {})
    }

    /// [`rebuild_closure`](Self::rebuild_closure) reporting the running count of relinked
    /// locations after each one.
    pub fn rebuild_closure_with_progress(
        &mut self,
        cancel: &AtomicBool,
        mut progress: impl FnMut(usize),
    ) -> Result<RebuildReport, StoreError> {
        let tx = self.write_tx()?;
        let cleared = clear_closure_tx(&tx)?;

        let mut report = RebuildReport {
            nodes: 0,
            entries: 0,
        };
        let mut relinked = 0usize;
        let mut tick = || {
            relinked += 1;
            progress(relinked);
        };
        for root_id in root_ids_tx(&tx)? {
            let rebuilt = rebuild_subtree_tx(&tx, &root_id, None, Some(cancel), &mut tick)?;
            report.nodes += rebuilt.nodes;
            report.entries += rebuilt.entries;
        }

        let total = location_count_tx(&tx)?;
        if report.nodes != total {
            tracing::warn!(
                reachable = report.nodes,
                total,
                "locations unreachable from any root"
            );
            return Err(StoreError::CorruptHierarchy(
                "some locations are not reachable from any root",
            ));
        }

        tx.commit()?;
        tracing::info!(
            nodes = report.nodes,
            entries = report.entries,
            previous_entries = cleared,
            "closure rebuilt"
        );
        Ok(report)
    }

    /// Compares the stored closure with the one implied by parent pointers.
    pub fn verify_closure(&self) -> Result<ClosureReport, StoreError> {
        let tx = self.read_tx()?;
        let parents = parent_pointers_tx(&tx)?;
        let stored = closure_entries_tx(&tx)?;
        let expected = derive_closure(&parents).map_err(|fault| {
            tracing::warn!(?fault, "parent pointers are not a forest");
            StoreError::CorruptHierarchy(fault.message())
        })?;

        let drift = ClosureDrift::between(&expected, &stored);
        if !drift.is_empty() {
            tracing::warn!(
                missing = drift.missing.len(),
                stale = drift.stale.len(),
                "closure drift detected"
            );
        }
        Ok(ClosureReport {
            nodes: parents.len(),
            entries: stored.len(),
            missing: drift.missing,
            stale: drift.stale,
        })
    }
}
