pub mod records;
pub mod source;

pub use records::*;
pub use source::*;
