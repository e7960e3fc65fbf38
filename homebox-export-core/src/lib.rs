#![doc = "homebox-export-core: core export pipeline for homebox-export."]

//! This crate holds the data model, naming rules and orchestration for exporting a
//! Homebox inventory and its attachments to a local directory tree.
//! The live HTTP client lives in the `homebox-export` crate; this crate only knows
//! the [`contract::HomeboxApi`] trait.
//!
//! # Usage
//! Build an [`export::Exporter`] from an [`config::ExportConfig`], any `HomeboxApi`
//! implementation and an [`contract::ExportReporter`], then call `export_all`.

pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod filesystem;
pub mod naming;
pub mod report;
