pub mod board;
pub mod session;

pub use board::{ApprovalOutcome, SubtaskBoard, SubtaskRun};
pub use session::{RunTarget, Session};
