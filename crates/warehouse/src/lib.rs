// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Warehouse client for running multi-statement SQL scripts.
//!
//! A [`Connection`] logs in with password credentials from a
//! [`ConnectionConfig`], hands out a [`SnowflakeCursor`], and
//! [`run_script`] drives any [`Cursor`] through a `;`-separated script,
//! returning the final statement's rows as an Arrow [`RecordBatch`].

pub mod config;
pub mod error;
pub mod protocol;
pub mod rowset;
pub mod script;
pub mod session;

pub use arrow_array::RecordBatch;
pub use config::ConnectionConfig;
pub use error::{Result, WarehouseError};
pub use script::{Cursor, ScriptReport, run_script, run_script_with_report, split_statements};
pub use session::{Connection, SnowflakeCursor};
