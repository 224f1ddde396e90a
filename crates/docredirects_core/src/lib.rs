pub mod config;
pub mod error;
pub mod location;
pub mod records;
pub mod redirects;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod script;

pub use error::{Error, Result};
pub use location::Location;
pub use records::{RedirectRecord, RedirectRecords};
pub use redirects::Redirects;
pub use registry::{CurrentLocations, XrefTarget};
pub use report::ValidationReport;
pub use script::ScriptTemplate;
