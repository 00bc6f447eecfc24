//! Use cases of the moderation core.

pub mod inbox;
pub mod notify_users;
pub mod social_media;
pub mod statistic;

#[cfg(test)]
pub(crate) mod testing;

pub use inbox::{InboxError, InboxService};
pub use notify_users::NotifyUsersService;
pub use social_media::SocialMediaService;
pub use statistic::StatisticService;
