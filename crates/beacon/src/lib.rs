// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! # Beacon - Discovery Protocol Engine
//!
//! A service-lookup discovery engine: clients locate registry-like services
//! over multicast, then retrieve a full registrar reference over a unicast
//! exchange that may be plaintext, X.500-signed, or tunneled through an
//! arbitrary caller-supplied secure transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beacon::config::RuntimeConfig;
//! use beacon::constraint::ConstraintSet;
//! use beacon::discovery::{discover_host, Deadline, PlaintextAttempt};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), beacon::discovery::DiscoveryError> {
//!     let config = RuntimeConfig::from_env();
//!     let attempt = PlaintextAttempt::new(&config, ConstraintSet::empty());
//!     let outcome = discover_host(
//!         "lookup.example.org",
//!         4160,
//!         &attempt,
//!         Deadline::after(Duration::from_secs(30)),
//!     )?;
//!     println!("registrar: {} bytes", outcome.response.registrar.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Discovery Driver                            |
//! |   multi-address unicast attempts | deadline propagation            |
//! +--------------------------------------------------------------------+
//! |                     Format Negotiation Layer                       |
//! |   constraint distillation | credential scoring | format registry   |
//! +--------------------------------------------------------------------+
//! |                          Wire Codec                                |
//! |   multicast request/announcement datagrams | unicast stream        |
//! |   plaintext framing | signed framing (principal + signature)       |
//! +--------------------------------------------------------------------+
//! |                         Transports                                 |
//! |   UDP multicast | TCP unicast | captured secure endpoints          |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`constraint::ConstraintSet`] | Immutable requirements/preferences on a discovery exchange |
//! | [`protocol::MulticastRequest`] | Datagram asking lookup services to announce themselves |
//! | [`protocol::MulticastAnnouncement`] | Datagram announcing a lookup service |
//! | [`protocol::UnicastResponse`] | Stream message carrying the registrar reference |
//! | [`security::PrivateCredential`] | (principal, certificate, key) tuple used to sign messages |
//! | [`discovery::FormatRegistry`] | Explicit format-name -> provider table |

/// Compile-time wire constants and runtime configuration.
pub mod config;
/// Invocation-constraint algebra (requirements, preferences, alternatives).
pub mod constraint;
/// Multi-address discovery driver and format registry.
pub mod discovery;
/// Secure-transport capture bridge and unicast handshake.
pub mod endpoint;
/// Binary wire codec for discovery messages.
pub mod protocol;
/// Constraint negotiation, credential selection, signed framing.
pub mod security;
