//! Instagram Graph API client and the Reel publication workflow.
//!
//! The workflow turns a private video object in blob storage into a live
//! Reel: signed URL → reachability probe → media container → processing
//! poll → publish. Strictly sequential, fail-fast, nothing persisted.

pub mod graph;
pub mod workflow;

pub use graph::{GraphClient, StatusReport};
pub use workflow::{PublishOptions, ReelPublisher};
