pub mod dates;
pub mod serialization;

pub use dates::parse_datetime;
pub use serialization::{audit_resources, ResultFormat, SummaryRenderer};
