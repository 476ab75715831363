//! Declarative data model: the embedded table catalog and its resolved runtime form.

pub mod duration;
pub mod loader;
pub mod resolved;
pub mod types;
pub mod validator;

pub use loader::*;
pub use resolved::*;
pub use types::*;
pub use validator::*;
