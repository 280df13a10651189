pub mod actor;
pub mod attendance;
pub mod break_interval;
pub mod patch;
pub mod proposal;
pub mod role;

pub use actor::Actor;
pub use attendance::{Attendance, AttendanceField, AttendanceStatus, DayState, NewAttendance};
pub use break_interval::{BreakInterval, Span};
pub use patch::Patch;
pub use proposal::{
    AttendanceProposal, BreakOwner, BreakProposal, NewAttendanceProposal, NewBreakProposal,
    ProposalKind, ProposalStatus,
};
pub use role::Role;
