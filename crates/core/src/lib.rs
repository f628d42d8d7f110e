mod error;

pub mod domain;
pub mod machine;
pub mod policy;
pub mod status_meta;

pub use domain::*;
pub use error::CoreError;
