// Copyright (c) 2026 Custodia Maintainers. MIT License.
// See LICENSE for details.

//! # CUSTODIA Ledger -- Core Library
//!
//! A multi-asset custodial ledger that lets accounts deposit and withdraw a
//! fixed set of registered assets while guaranteeing two global limits:
//! the aggregate *mark-to-market* value of everything held never exceeds a
//! configurable capacity, and no single withdrawal exceeds a configurable
//! per-operation ceiling. Value is measured in a common denomination derived
//! from live price feeds, so the capacity check reflects current prices,
//! not historical deposit amounts.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! custodial bank:
//!
//! - **config** -- Protocol constants. Every magic number lives here.
//! - **asset** -- Asset and price-source identifiers.
//! - **access** -- The two-role permission gate (administrator, operator).
//! - **registry** -- Bounded, append-only registry of listed assets.
//! - **oracle** -- Injected price-feed and asset-metadata capabilities.
//! - **transfer** -- Injected external transfer capability (pull/push).
//! - **valuation** -- Fixed-point normalization into the common denomination.
//! - **ledger** -- Per-account balance store with audit counters.
//! - **guard** -- Capacity and per-withdrawal limit enforcement.
//! - **events** -- Fire-and-forget notification records for observers.
//! - **bank** -- The transaction protocol that ties it all together.
//!
//! ## Design Philosophy
//!
//! 1. A failed operation leaves no trace. Atomicity is the product.
//! 2. Internal state mutates before any external transfer call runs.
//! 3. Every external dependency is a trait, so tests inject deterministic
//!    fakes.
//! 4. If it touches money, it has tests. Plural.

pub mod access;
pub mod asset;
pub mod bank;
pub mod config;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod oracle;
pub mod registry;
pub mod transfer;
pub mod valuation;
