mod room;
mod room_command;
mod room_handle;
mod room_options;
mod room_snapshot;

pub use room::MeshRoom;
pub use room_command::RoomCommand;
pub use room_handle::RoomHandle;
pub use room_options::{RoomDeps, RoomOptions};
pub use room_snapshot::{RoomSnapshot, SessionView};
