//! Core trait abstractions for the discovery library.
//!
//! These traits define the interfaces applications implement to provide
//! catalog search, resource fetching and remote entity extraction.

pub mod catalog;
pub mod extractor;
pub mod fetcher;
