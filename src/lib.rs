//! SiteWatch - get notified when a web page's visible text changes

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod notify;
pub mod scheduler;
pub mod snapshot;
pub mod types;
pub mod utils;
pub mod watchlist;

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, WatchError};
pub use scheduler::{Scheduler, SchedulerState};
pub use types::{ChangeEvent, Outcome, ResourceId, TickReport};
