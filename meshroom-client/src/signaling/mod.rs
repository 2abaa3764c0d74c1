mod mailbox_output;
mod signaling_output;

pub use mailbox_output::MailboxOutput;
pub use signaling_output::SignalingOutput;
