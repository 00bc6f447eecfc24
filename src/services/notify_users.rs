//! Digest mails for completed inbox entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::models::InboxEntry;
use crate::ports::{InboxPort, MailerPort, UserPort};

pub struct NotifyUsersService {
    user_port: Arc<dyn UserPort>,
    inbox_port: Arc<dyn InboxPort>,
    mailer: Arc<dyn MailerPort>,
}

impl NotifyUsersService {
    pub fn new(
        user_port: Arc<dyn UserPort>,
        inbox_port: Arc<dyn InboxPort>,
        mailer: Arc<dyn MailerPort>,
    ) -> Self {
        Self {
            user_port,
            inbox_port,
            mailer,
        }
    }

    /// Send one digest per photographer for all done-but-unnotified
    /// entries, then mark every loaded entry notified. Opted-out users
    /// are marked too, so their entries are not reprocessed forever.
    pub async fn notify_users(&self) -> anyhow::Result<()> {
        let entries = self.inbox_port.find_inbox_entries_to_notify().await?;

        let mut by_user: BTreeMap<i64, Vec<&InboxEntry>> = BTreeMap::new();
        for entry in &entries {
            by_user.entry(entry.photographer_id).or_default().push(entry);
        }

        for (user_id, entries_for_user) in by_user {
            let Some(user) = self.user_port.find_by_id(user_id).await? else {
                continue;
            };
            let Some(email) = user.email.as_deref() else {
                continue;
            };
            if user.is_email_verified() && user.send_notifications {
                self.send_email_notification(&entries_for_user, email, &user.name);
            }
        }

        let ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
        if !ids.is_empty() {
            self.inbox_port.update_notified(&ids).await?;
        }
        Ok(())
    }

    fn send_email_notification(&self, entries: &[&InboxEntry], email: &str, username: &str) {
        let mut report = String::new();
        for entry in entries {
            report.push_str(&format!(
                "{}. {}",
                entry.id,
                entry.title.as_deref().unwrap_or_default()
            ));
            if let Some(report_type) = entry.problem_report_type {
                report.push_str(&format!(" ({})", report_type.name()));
            }
            report.push_str(": ");
            match entry.reject_reason.as_deref() {
                None => report.push_str("accepted"),
                Some(reason) => report.push_str(&format!("rejected - {reason}")),
            }
            report.push('\n');
        }

        let text = format!(
            "Hello {username},\n\nthank you for your contribution.\n\n{report}\nCheers\nYour Railpix team",
        );
        self.mailer.send(email, "Railpix review result", &text);
        info!("email notification sent to {email}");
    }
}
