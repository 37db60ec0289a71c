use crate::session::SessionState;
use numflow_core::error::SimulationError;
use numflow_core::stage::StageError;
use numflow_data::DataLoadError;

/// Errors raised by sessions and campaigns.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The command is not accepted in the session's current state.
    #[error("cannot {action} while {state}")]
    Busy {
        action: &'static str,
        state: SessionState,
    },

    /// The stage could not be built.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The run aborted on a malformed stage.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// The stage pack could not be loaded.
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    /// The catalog has no stages.
    #[error("campaign has no stages")]
    EmptyCampaign,

    /// The requested stage id is not in the catalog.
    #[error("stage '{id}' not found in catalog")]
    StageNotFound { id: String },

    /// `advance` was called before the current stage was cleared.
    #[error("stage '{id}' has not been cleared")]
    NotCleared { id: String },

    /// `advance` was called on the last stage.
    #[error("campaign is already on its last stage")]
    CampaignComplete,
}
