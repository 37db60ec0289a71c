//! Walks a stage pack in catalog order.

use std::path::Path;

use numflow_core::sim::SimConfig;
use numflow_data::{StageCatalog, StagePack, load_stage_pack};
use tracing::info;

use crate::error::SessionError;
use crate::session::{Session, SessionState};

/// A run through every stage of a catalog, one session at a time. The next
/// stage unlocks only once the current one has been cleared.
#[derive(Debug, Clone)]
pub struct Campaign {
    catalog: StageCatalog,
    config: SimConfig,
    order: Vec<String>,
    index: usize,
    session: Session,
}

impl Campaign {
    pub fn new(pack: StagePack) -> Result<Self, SessionError> {
        let StagePack { catalog, config } = pack;
        let order: Vec<String> = catalog.ids().map(str::to_string).collect();
        let first = order.first().ok_or(SessionError::EmptyCampaign)?;
        let session = open(&catalog, &config, first)?;
        Ok(Self {
            catalog,
            config,
            order,
            index: 0,
            session,
        })
    }

    /// Load the stage pack in `dir` and open its first stage.
    pub fn load(dir: &Path) -> Result<Self, SessionError> {
        Self::new(load_stage_pack(dir)?)
    }

    pub fn current_id(&self) -> &str {
        &self.order[self.index]
    }

    /// Zero-based position of the current stage.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.order.len()
    }

    /// The last stage has been cleared.
    pub fn is_finished(&self) -> bool {
        self.is_last() && self.session.state() == SessionState::Success
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Move on to the next stage. Requires the current stage to be showing
    /// its success verdict.
    pub fn advance(&mut self) -> Result<&str, SessionError> {
        if self.session.state() != SessionState::Success {
            return Err(SessionError::NotCleared {
                id: self.current_id().to_string(),
            });
        }
        if self.is_last() {
            return Err(SessionError::CampaignComplete);
        }
        let next = self.index + 1;
        self.session = open(&self.catalog, &self.config, &self.order[next])?;
        self.index = next;
        info!(stage = %self.current_id(), index = next, "campaign advanced");
        Ok(self.current_id())
    }
}

fn open(catalog: &StageCatalog, config: &SimConfig, id: &str) -> Result<Session, SessionError> {
    let stage = catalog
        .build(id)
        .ok_or_else(|| SessionError::StageNotFound { id: id.to_string() })??;
    Ok(Session::new(stage, config.clone()))
}
