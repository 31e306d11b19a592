pub mod request_logging;

pub use request_logging::{RequestLogging, REQUEST_ID_HEADER};
