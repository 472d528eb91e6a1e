//! Replay recorded sensor sessions through the arm kinematics core.

pub mod config;
pub mod output;
pub mod player;
pub mod session;
pub mod simulate;

pub use config::{load_config, save_config, AppConfig};
pub use output::{OutputFormat, PoseWriter};
pub use player::{consume, Replay, ReplayCommand, ReplayWorker};
pub use session::{frames_for, load_recording, Session, SessionReport};
pub use simulate::{bicep_curl, write_simulation};
