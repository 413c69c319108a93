// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! boxci-git: thin command-line `git` wrapper.
//!
//! Every operation returns a plain `bool`/`Option<String>` — never a
//! `Result` — per spec.md §4.4: failures are logged (to `tracing` and,
//! when supplied, to a build's events stream) and reported through the
//! return value, not raised.

mod driver;

pub use driver::GitDriver;
