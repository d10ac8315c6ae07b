//! Git integration for streamrev.
//!
//! A dedicated `std::thread` owns the `git2::Repository` (which is !Send) and
//! turns `GitRequest`s into unified patch text for the diff parser.
pub mod types;
pub mod worker;
