pub mod domain;
pub mod evaluate;
pub mod loader;
pub mod ports;
pub mod wire;

pub use domain::{
    CandidatePage, Conversation, Part, PartAuthor, Participation, ReportPage, ReportRow,
    SearchWindow,
};
pub use evaluate::{evaluate_participation, normalize_epoch_seconds};
pub use loader::{LoadPhase, LoadSummary, PageButton, ProgressiveLoader};
pub use ports::{ConversationSource, PortError, PortResult, ReportPageSource};
