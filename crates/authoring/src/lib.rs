//! Trek authoring: the five-step wizard and the managers it drives.
//!
//! Each manager owns one sub-resource of a trek and talks to the backend
//! through a gateway trait. Every remote failure, expected or transport,
//! comes back as an [`AuthoringError`] carrying a user-visible message.

pub mod activities;
pub mod attachments;
pub mod error;
pub mod gallery;
mod remote;
pub mod wizard;

pub use activities::ActivityList;
pub use attachments::AttachmentSet;
pub use error::AuthoringError;
pub use gallery::{Gallery, StageReport};
pub use wizard::WizardController;
