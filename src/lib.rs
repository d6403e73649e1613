pub mod channel;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod launch;
pub mod logbuf;
pub mod metadata;
pub mod models;
pub mod monitor;
pub mod progress;
pub mod quiz;

pub use channel::ChannelClient;
pub use config::Config;
pub use control::Controller;
pub use dispatcher::ScanMonitor;
pub use error::{MonitorError, QuizError};
pub use events::{Command, ScanEvent, StartConfig, StatusSnapshot};
pub use launch::{LaunchParams, LaunchStore};
pub use logbuf::{LogBuffer, ScrollMetrics};
pub use metadata::{MetadataClient, ScanMetadata};
pub use monitor::{MonitorOutcome, MonitorRuntime, UiAction};
pub use quiz::{QuizGate, QuizState};
