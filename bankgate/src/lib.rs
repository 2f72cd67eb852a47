#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the bankgate adapter.
//!
//! The bank exposes two incompatible products: a token-authenticated
//! core-banking gateway (OPG, signed JSON) and a virtual-account collection
//! service (VA, encrypted form bodies). This crate holds everything about them
//! that needs no network: the VA payload cipher, the request/response
//! contract variants, and the registries that pick a variant by name.
//!
//! # Modules
//!
//! - [`cipher`] - VA payload cipher with its replay window
//! - [`config`] - Endpoints and credentials
//! - [`contract`] - Request and response variants and their wire forms
//! - [`error`] - Cipher, request, response and registry errors
//! - [`reference`] - Reference number generation
//! - [`registry`] - Resource-keyed constructors
//! - [`resource`] - Resource identifiers
//! - [`timestamp`] - Unix timestamps
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events for rejected ciphertexts and
//!   registry misses

pub mod cipher;
pub mod config;
pub mod contract;
pub mod error;
pub mod reference;
pub mod registry;
pub mod resource;
pub mod timestamp;

pub use config::{BankConfig, Endpoint, OpgConfig, OpgCredentials, VaConfig, VaCredentials};
pub use contract::{BankRequest, BankResponse, OpgOperation, VaProduct, WireBody, WireRequest};
pub use error::{BusinessFailure, CipherError, RegistryError, RequestError, ResponseError};
pub use reference::ReferenceNumber;
pub use registry::{Registry, RequestRegistry, ResponseRegistry};
pub use resource::ResourceId;
