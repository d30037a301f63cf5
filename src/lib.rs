//! GIFTs library main entry point.

pub mod alignments;
pub mod common;
pub mod db;
pub mod error;
pub mod history;
pub mod jobs;
pub mod loader;
pub mod mapping;
pub mod model;
pub mod sequence;
pub mod server;
pub mod store;

/// Information about the build.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
