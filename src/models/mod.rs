//! Domain model: immutable value objects and their derivations.

mod coordinates;
mod country;
mod inbox_command;
mod inbox_entry;
mod inbox_response;
mod inbox_state_query;
mod license;
mod photo;
mod problem_report;
mod public_inbox_entry;
mod station;
mod statistic;
mod user;

pub use coordinates::Coordinates;
pub use country::Country;
pub use inbox_command::{ConflictResolution, InboxCommand};
pub use inbox_entry::{create_inbox_filename, InboxEntry};
pub use inbox_response::{InboxResponse, InboxResponseState};
pub use inbox_state_query::{InboxState, InboxStateQuery};
pub use license::License;
pub use photo::Photo;
pub use problem_report::{ProblemReport, ProblemReportType};
pub use public_inbox_entry::PublicInboxEntry;
pub use station::{Station, StationKey};
pub use statistic::Statistic;
pub use user::{User, ANONYM, EMAIL_VERIFIED, EMAIL_VERIFIED_AT_NEXT_LOGIN};
