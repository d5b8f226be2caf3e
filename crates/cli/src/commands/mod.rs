pub mod compare;
pub mod util;

pub use compare::*;
pub use util::*;
