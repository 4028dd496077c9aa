pub mod boundary;
pub mod envelope;
pub mod table;

pub use boundary::*;
pub use envelope::*;
pub use table::*;
