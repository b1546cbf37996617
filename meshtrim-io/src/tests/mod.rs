//! File-level tests for meshtrim-io
//!
//! These go through the filesystem and check extension dispatch and
//! round trips across formats.

pub mod scene_file_tests;
