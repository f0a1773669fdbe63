#![doc = "gdrive-clone-core: core logic library for gdrive-clone."]

//! This crate holds all the logic for cloning a remote drive tree onto local disk:
//! the item model, recursive listing, the export table, chunked downloading and
//! the run orchestration, plus HTTP and credential implementations of the
//! capability traits in [`contract`].
//!
//! # Usage
//! Build a [`contract::DirectoryService`] (usually [`drive::GoogleDriveClient`]
//! from a credential yielded by [`credentials::TokenFileCredentials`]) and hand
//! it to [`clone::clone_drive`].

pub mod clone;
pub mod contract;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod export_rules;
pub mod exporter;
pub mod item;
pub mod lister;
