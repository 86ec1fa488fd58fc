//! Golden-output harness for a single C++ subject program.
//!
//! Fixtures are numbered input files; each one is fed to the subject on
//! stdin, the captured output is cut at the `EOS` sentinel and the part
//! before it is diffed line by line against the matching expected file.

pub mod config;
pub mod domain;
pub mod modules;
