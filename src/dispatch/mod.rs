// Outbound mail handoff and its helpers
pub mod render;
pub mod sms;
pub mod smtp;

pub use sms::sms_email_address;
pub use smtp::SmtpMailer;

use anyhow::Result;

/// Narrow seam between the engine and whatever actually submits mail.
///
/// The engine calls this synchronously from event processing, so
/// implementations must enforce their own bounded timeout and report
/// failure instead of hanging.
pub trait MailDispatch {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}
