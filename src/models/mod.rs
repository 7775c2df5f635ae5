pub mod account;
pub mod envelope;
pub mod proxy;
pub mod session;
pub mod state;

pub use account::*;
pub use envelope::*;
pub use proxy::*;
pub use session::*;
pub use state::*;
