pub mod client;

pub use client::{Downloader, FetchOutcome};
