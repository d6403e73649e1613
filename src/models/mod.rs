pub mod findings;
pub mod quiz;
pub mod session;

pub use findings::{Endpoint, LogEntry, LogLevel, ParameterHit, Severity, Vulnerability};
pub use quiz::{Question, QuestionHistoryEntry};
pub use session::{
    ConnectionState, ExecutionState, Phase, PhaseStatus, ScanSession, ScanStatistics, Subphase,
    build_phase_plan,
};
