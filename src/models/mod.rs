pub mod dns;
pub mod proxy;
pub mod status;

pub use dns::*;
pub use proxy::*;
pub use status::*;
