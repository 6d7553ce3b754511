//! `restkit-core` — shared building blocks for services built on restkit.
//!
//! This crate has no HTTP or transport concerns: it holds the business error
//! taxonomy, process-wide settings and pagination arithmetic.

pub mod error;
pub mod pagination;
pub mod settings;

pub use error::{BusinessError, BusinessResult, FieldErrors};
pub use pagination::{PageWindow, PaginationError, PaginationInfo, Paginator};
pub use settings::{Settings, SettingsError};
