use std::sync::Arc;

use super::api::{Command, CommandAck, DashboardApi};
use super::controller::Core;
use super::error::{Operation, SyncError};

impl<A: DashboardApi> Core<A> {
    /// Sends a command and, for start/stop, reconciles with one fresh batch.
    ///
    /// The reconciling refresh runs whatever the command's outcome. When the
    /// command succeeded, a reconcile failure becomes the recorded fetch
    /// error. When the command failed, it is attached to the command error,
    /// which stays the headline.
    pub(crate) async fn execute(self: &Arc<Self>, command: Command) -> Result<CommandAck, SyncError> {
        let operation = Operation::from(command);
        let _busy = self.store.begin_operation();

        log::info!("sending {} command", command);
        let outcome = self
            .bounded(command.endpoint(), self.api.send_command(command))
            .await
            .map_err(|cause| SyncError::new(operation, cause));

        match &outcome {
            Ok(ack) => log::info!(
                "{} acknowledged: {}",
                command,
                ack.message.as_deref().unwrap_or("ok")
            ),
            Err(err) => {
                log::warn!("{}", err);
                self.store.record_error(err.clone());
            }
        }

        if !command.reconciles() {
            return outcome;
        }

        let floor = self.flights.launched();
        let Err(cause) = self.refresh_after(floor).await else {
            return outcome;
        };
        log::warn!("reconcile after {} failed: {}", command, cause);
        match outcome {
            Ok(ack) => {
                self.store.record_error(SyncError::new(Operation::Refresh, cause));
                Ok(ack)
            }
            Err(err) => {
                let err = err.with_reconcile_failure(cause);
                self.store.record_error(err.clone());
                Err(err)
            }
        }
    }
}
