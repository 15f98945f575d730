pub mod auth;
pub mod entry;
pub mod errors;
pub mod report;
pub mod safepath;

pub use auth::*;
pub use entry::*;
pub use errors::*;
pub use report::*;
pub use safepath::*;
