mod mailbox;
mod presence;

pub use mailbox::RelayMailbox;
pub use presence::PresenceRegistry;
