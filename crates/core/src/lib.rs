//! Domain types and pure rules for composing a trek.
//!
//! Nothing in this crate performs I/O. The gateway crate moves these types
//! over the wire and the authoring crate drives them through the wizard.

pub mod activity;
pub mod catalog;
pub mod duration;
pub mod error;
pub mod image;
pub mod ordering;
pub mod trek;
pub mod types;
pub mod upload;
pub mod validation;
pub mod wizard;
