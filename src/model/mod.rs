pub mod directory;
pub mod event;
pub mod record;
pub mod session;
pub mod view;

pub use directory::{Department, Employee, Location};
pub use event::RealtimeEvent;
pub use record::{OrderItem, PriorityChange, Record, RecordId, Section};
pub use session::{Session, User};
pub use view::{View, ViewScope};
