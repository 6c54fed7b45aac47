mod count;
mod process;

use crate::models::DocumentReport;

pub struct ProcessResult {
    pub documents: Vec<DocumentReport>,
    pub excluded_count: usize,
}

pub use self::count::count;
pub use self::process::{process, process_document};
