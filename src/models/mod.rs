mod field_name;
mod output;
mod report;

pub use field_name::FieldName;
pub use output::{ExtraData, Header, OUTPUT_FORMAT_VERSION, Output, SystemEnvironment};
pub use report::{DocumentReport, DocumentReportBuilder};
