//! Client code for ogp-server.
//!
//! This crate provides the HTTP fetch pipeline, destination URL handling and
//! Open Graph metadata resolution used by the server.

pub mod fetch;
pub mod opengraph;

pub use fetch::{Destination, FetchClient, FetchConfig, FetchResponse, UrlError, canonicalize};
pub use opengraph::{MetadataResolver, OpenGraph, OpenGraphResolver, parse_open_graph};
