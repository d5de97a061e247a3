mod jwt_codec;
mod session_manager;

pub use jwt_codec::*;
pub use session_manager::*;
