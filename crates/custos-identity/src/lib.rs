//! Custos Identity: DID documents, the local DID registrar, resolver chain
//! and the public-key fetcher used by proof verification.

pub mod did;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod resolver;

pub use did::{CreateDidOptions, DidManager, DidRegistrar};
pub use document::{Authentication, DidDocument, PublicKeyEntry};
pub use error::IdentityError;
pub use fetcher::{PublicKeyFetcher, ResolverKeyFetcher};
pub use resolver::{CompositeDidResolver, DidResolver, KeyDidResolver, LocalDidResolver};
