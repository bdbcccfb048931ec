pub mod enums;
pub mod analysis;
pub mod explanation;

pub use enums::*;
pub use analysis::*;
pub use explanation::*;
