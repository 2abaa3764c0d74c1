pub use meshroom_core::{Identity, RoomId};

pub mod model {
    pub use meshroom_core::model::*;
}

pub mod store {
    pub use meshroom_core::store::*;
    pub use meshroom_core::traits::*;
    pub use meshroom_core::StoreError;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshroom_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use meshroom_relay::*;
}
