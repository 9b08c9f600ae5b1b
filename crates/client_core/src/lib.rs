//! Client side of the store survey: per-step forms, the upload client and
//! the wizard that ties them together.

pub mod backend;
pub mod forms;
pub mod upload;
pub mod wizard;

pub use backend::{HttpSurveyBackend, SurveyBackend};
pub use forms::{FieldError, StepError, StepResult, ValidationErrors};
pub use upload::{PendingFile, UploadClient, UploadError};
pub use wizard::{StepId, SurveyWizard, WizardError, WizardState};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
