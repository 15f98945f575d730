pub mod identity;
pub mod lock;
pub mod transport;

pub use identity::{IdentityProvider, SystemIdentity};
pub use lock::file::FileLockManager;
pub use lock::{LockGuard, LockManager};
pub use transport::{FetchResponse, HttpTransport, Transport};
