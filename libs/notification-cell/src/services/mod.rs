pub mod confirmation;
pub mod mailer;

pub use confirmation::NotificationService;
pub use mailer::{HttpMailTransport, MailTransport};
