//! Stream source acquisition.
//!
//! ## Contents
//! - [`Resolver`] — the cloud camera client contract
//! - [`StreamSource`], [`SourceKind`] — what the transcoder is fed
//! - [`ResolveError`] — typed failure taxonomy the session routes on
//! - [`HttpResolver`] — REST binding of the contract

mod http;
mod resolver;

pub use http::HttpResolver;
pub use resolver::{ResolveError, Resolver, ResolverRef, SourceKind, StreamSource};
