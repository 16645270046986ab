// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composite executors: the root of the execution tree and the serial and
//! parallel orchestrators.

pub mod parallel;
pub mod root;
pub mod serial;

pub use parallel::ParallelExecutor;
pub use root::RootExecutor;
pub use serial::SerialExecutor;
