//! REST access to the desk service.
//!
//! - [`HttpTransport`]: the wire seam, with [`ReqwestTransport`] for real use
//! - [`ApiGateway`]: bearer token, single-flight refresh, one retry on 401
//! - [`DeskApi`]: typed endpoints; implements [`RecordBackend`] and
//!   [`TicketSource`] for the stores and the realtime channel

pub mod backend;
pub mod endpoints;
pub mod envelope;
pub mod gateway;
pub mod transport;

pub use backend::{RecordBackend, TicketSource};
pub use endpoints::{ApprovalDecision, DeskApi, NewTicket, TicketUpdate};
pub use gateway::ApiGateway;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
