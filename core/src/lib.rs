//! Client core for the remote payment gateway.
//!
//! # Overview
//! Forwards card, ATM, merchant, platform, currency, order, redirect-payment
//! and qualification-upload operations to one gateway service and turns its
//! mixed status conventions into a single `NormalizedResult`.
//!
//! # Design
//! - `PaygateClient` holds no mutable state; the action `Registry` is fixed
//!   and validated at construction.
//! - Each call is `prepare` (resolve + build, no I/O), one `Transport::send`,
//!   then `PreparedCall::parse` (decode + normalize). Hosts may run the I/O
//!   themselves between the two.
//! - Every call path is total: unsupported actions, bad parameters, missing
//!   upload files, transport errors, undecodable bodies and upstream
//!   rejections all come back as a failed `NormalizedResult`.

pub mod client;
pub mod config;
pub mod decode;
pub mod encoding;
pub mod error;
pub mod http;
pub mod normalize;
pub mod observe;
pub mod registry;
#[cfg(test)]
mod testing;
pub mod transport;
pub mod types;
pub mod upload;

pub use client::{PaygateClient, PreparedCall};
pub use config::ClientConfig;
pub use decode::{decode, DecodedBody};
pub use encoding::Encoding;
pub use error::{ConfigError, EncodeError, SourceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RawOutcome};
pub use normalize::{normalize, FailureLayer, NormalizedResult, Rule};
pub use observe::{NoopObserver, Observer, TracingObserver};
pub use registry::{ActionDescriptor, AtmAction, GatewayAction, Registry};
pub use transport::{Transport, UreqTransport};
pub use upload::{FileRef, FileSource, InMemoryFileSource, StorageFileSource, UploadSpec, UploadedFile};
