//! Testing utilities for code that talks to Neovim.
//!
//! Provides an in-memory editor that answers the RPC methods the adapter uses
//! and records every call, so tests can assert what reached the editor.

pub mod fake;

pub use fake::{FakeBuffer, FakeEditor, FakeWindow, RecordedCall};
