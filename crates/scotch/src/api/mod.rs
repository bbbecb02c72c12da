//! REST access - accessors, transports and the in-memory test double

pub mod accessor;
pub mod memory;
pub mod transport;

pub use accessor::{ApiAccessor, WriteResponse, SUCCESS_MARKER};
pub use memory::MemoryTransport;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
