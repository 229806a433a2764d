//! Digestwatch HTTP Client
//!
//! Fetchers for the two upstream signal strategies: a Docker registry
//! manifest digest for a target platform, or a plain-text hash published at
//! a URL.
//!
//! Both strategies are pure with respect to local state: they return a
//! single marker string (or fail), touch nothing on disk, and leave retries
//! to the scheduler that invokes the run. A failed fetch aborts the current
//! run entirely.
//!
//! # Example
//!
//! ```no_run
//! use digestwatch_client::RegistryClient;
//!
//! # async fn example() -> digestwatch_client::Result<()> {
//! let registry = RegistryClient::new();
//! let digest = registry.manifest_digest("library/tomcat", "latest", "amd64").await?;
//!
//! match digest {
//!     Some(digest) => println!("current digest: {digest}"),
//!     None => println!("no manifest entry for amd64"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hash;
pub mod registry;

pub use error::{ClientError, Result};
pub use registry::RegistryClient;
