//! Backend commands queued from UI to backend worker.

use client_core::forms::LanguageForm;
use shared::domain::{LanguageId, ProgrammingLanguage, SortKey};

pub enum BackendCommand {
    RestoreSession,
    Login {
        username: String,
        password: String,
    },
    Logout,
    Reload,
    Search {
        term: String,
    },
    ToggleSort {
        column: SortKey,
    },
    ToggleSelect {
        id: LanguageId,
    },
    ToggleSelectAll,
    RequestDelete {
        record: ProgrammingLanguage,
    },
    CancelDelete,
    ConfirmDelete,
    RequestBulkDelete,
    CancelBulkDelete,
    ConfirmBulkDelete,
    OpenDetails {
        id: LanguageId,
    },
    /// `None` opens an empty form for a new record.
    OpenEditor {
        id: Option<LanguageId>,
    },
    SubmitForm {
        id: Option<LanguageId>,
        form: LanguageForm,
    },
}
