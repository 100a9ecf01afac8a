//! Shared path helpers reused by the toolrun crates. The sandbox only needs a
//! handful of them (same-path checks for the working-directory short-circuit),
//! so they live here instead of being re-implemented next to each caller.

pub mod paths;

pub use paths::{drive_path_to_posix, is_same_path, normalize_path, win_path_to_posix};
