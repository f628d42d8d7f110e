mod enrollment;
mod prospect;
mod sequence;
mod session;

pub use enrollment::*;
pub use prospect::*;
pub use sequence::*;
pub use session::*;
