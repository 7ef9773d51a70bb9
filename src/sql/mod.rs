pub mod complexity;
pub mod extract;
pub mod repair;
pub mod validate;

pub use complexity::*;
pub use extract::*;
pub use repair::*;
pub use validate::*;
