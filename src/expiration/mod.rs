// Expiration notices - clustering, rendering and the nag-window mailer

pub mod aggregator;
pub mod mailer;
pub mod template;
pub mod window;

pub use aggregator::{DomainCluster, ExpirationAggregator, ExpirationNotice};
pub use mailer::{DeliveryFailure, ExpirationMailer, MailerReport, MailerSettings};
pub use template::NoticeTemplate;
pub use window::ExpiryWindow;
