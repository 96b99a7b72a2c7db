//! # capx-modules: Module Catalog and Pipeline Composer
//!
//! The closed [`ModuleRegistry`] of formulation modules, the optional
//! callback capability set each module may implement, and the
//! [`PipelineComposer`] that invokes those callbacks against a shared model
//! in strict dependency order.

pub mod builtin;
pub mod composer;
pub mod registry;

pub use builtin::builtin_registry;
pub use composer::{resolve_order, PipelineComposer};
pub use registry::{Module, ModuleHooks, ModuleRegistry};
