//! Numflow Session -- headless game flow on top of the simulation engine.
//!
//! A [`Session`] is one stage being played: rotations, runs, frame-by-frame
//! playback of the result, retry and reset. A [`Campaign`] strings sessions
//! together across a stage pack.
//!
//! # Usage
//!
//! ```rust,ignore
//! use numflow_session::Campaign;
//!
//! let mut campaign = Campaign::load(Path::new("stages/"))?;
//! let session = campaign.session_mut();
//! session.rotate(GridPosition::new(1, 2))?;
//! session.run()?;
//! while let Some(frame) = session.next_frame() {
//!     draw(frame);
//! }
//! ```

pub mod campaign;
pub mod error;
pub mod session;

pub use campaign::Campaign;
pub use error::SessionError;
pub use session::{Session, SessionState};
