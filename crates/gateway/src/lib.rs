//! Remote Resource Gateway for the trek backend.
//!
//! Every call returns a uniform [`Envelope`]. An expected failure is an
//! envelope with `success: false`; only transport problems surface as a
//! [`GatewayError`]. [`HttpGateway`] talks to the REST backend and
//! [`MemoryGateway`] is an in-process backend with the same contract.

pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod session;

pub use config::GatewayConfig;
pub use envelope::Envelope;
pub use error::GatewayError;
pub use gateway::{
    ActivityGateway, CatalogGateway, Gateway, GatewayResult, ImageGateway, ProgressReporter,
    TrekGateway, UploadFile, UploadProgress,
};
pub use http::HttpGateway;
pub use memory::MemoryGateway;
pub use session::{SessionProvider, StaticSession};
