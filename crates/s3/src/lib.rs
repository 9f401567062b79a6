//! mineral-s3: S3 SDK adapter for the mineral CLI
//!
//! Implements the `ObjectStore` trait from mineral-core on top of
//! aws-sdk-s3.

mod client;

pub use client::S3Client;
