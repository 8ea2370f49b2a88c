//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn command_name(cmd: &BackendCommand) -> &'static str {
    match cmd {
        BackendCommand::RestoreSession => "restore_session",
        BackendCommand::Login { .. } => "login",
        BackendCommand::Logout => "logout",
        BackendCommand::Reload => "reload",
        BackendCommand::Search { .. } => "search",
        BackendCommand::ToggleSort { .. } => "toggle_sort",
        BackendCommand::ToggleSelect { .. } => "toggle_select",
        BackendCommand::ToggleSelectAll => "toggle_select_all",
        BackendCommand::RequestDelete { .. } => "request_delete",
        BackendCommand::CancelDelete => "cancel_delete",
        BackendCommand::ConfirmDelete => "confirm_delete",
        BackendCommand::RequestBulkDelete => "request_bulk_delete",
        BackendCommand::CancelBulkDelete => "cancel_bulk_delete",
        BackendCommand::ConfirmBulkDelete => "confirm_bulk_delete",
        BackendCommand::OpenDetails { .. } => "open_details",
        BackendCommand::OpenEditor { .. } => "open_editor",
        BackendCommand::SubmitForm { .. } => "submit_form",
    }
}

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = command_name(&cmd);

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend command processor disconnected; restart the app".to_string();
        }
    }
}
