// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite store for VPN profile allocation records.
//!
//! One row per provisioned profile. Revocation is a soft delete
//! (`is_active = 0`); uniqueness of address, public key and owner/name is
//! enforced among active rows only, so history stays queryable without
//! blocking reuse.

pub mod error;
pub mod pool;
pub mod profiles;

pub use error::{DbError, Result};
pub use pool::{create_pool, migrate};
pub use profiles::{ProfileRepository, ProfileRowTuple};
