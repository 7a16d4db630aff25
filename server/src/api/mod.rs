pub mod analyze;
pub mod client_ip;
pub mod error;

pub use analyze::analyze;
pub use error::AppError;
