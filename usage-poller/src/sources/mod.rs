pub mod nea_http;

pub use nea_http::{HttpUsageSource, SourceBuildError};
