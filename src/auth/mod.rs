pub mod session;

pub use session::{SessionListener, SessionManager};
