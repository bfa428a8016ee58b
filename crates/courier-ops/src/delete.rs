//! Delete driver.

use courier_core::{CancellationGate, ProgressSurface, TransferContext, WorkList};

use crate::engine::{CompletionStep, Engine, Halt, OperationResult, Session};
use crate::primitives::PathInfo;

impl Engine {
    /// Remove every entry of `list`, counting one unit per removed entry.
    pub fn delete(
        &self,
        list: &WorkList,
        surface: &dyn ProgressSurface,
        gate: &CancellationGate,
    ) -> OperationResult {
        let session = self.session("delete", surface, gate);
        let outcome = self.run_delete(&session, list);
        session.finish(outcome)
    }

    fn run_delete(&self, session: &Session<'_>, list: &WorkList) -> Result<CompletionStep, Halt> {
        let info = self.stat_all(list)?;
        session.estimate(info.entries());

        session.watched(false, |ctx| self.remove_items(session, list, ctx))?;
        Ok(CompletionStep::Deleted)
    }

    /// Stat-walk every item of `list` and sum the results.
    pub(crate) fn stat_all(&self, list: &WorkList) -> Result<PathInfo, Halt> {
        let mut info = PathInfo::default();
        for path in list.paths() {
            info.add(self.paths.path_info(&path, None)?);
        }
        Ok(info)
    }

    /// Remove each item in order, stopping at the first failure or at
    /// cancellation.
    pub(crate) fn remove_items(
        &self,
        session: &Session<'_>,
        list: &WorkList,
        ctx: &TransferContext<'_>,
    ) -> Result<(), Halt> {
        for item in list.items() {
            session.checkpoint()?;

            let path = list.path_string(item);
            session.show(&path);
            if self.paths.remove_path(&list.path_of(item), ctx)?.is_stopped() {
                return Err(Halt::Canceled);
            }
        }
        Ok(())
    }
}
