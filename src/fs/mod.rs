pub mod atomic;
pub mod backup;
pub mod compare;
pub mod meta;
pub mod write;

pub use atomic::{ensure_absent, fsync_parent_dir, open_dir, rename_in_dir};
pub use backup::{backup2_path, backup_path, transact, Commit, Snapshot};
pub use compare::same_contents;
pub use meta::{kind_of, resolve_link_dest, same_file, sha256_hex_of};
pub use write::{set_mode, write_file_with, write_symlink};
