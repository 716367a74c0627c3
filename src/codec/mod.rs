pub mod vault;

pub use vault::VaultCodec;

use crate::{Result, Value};

/// Transform pair applied to values crossing the engine boundary.
///
/// `compress` runs on every value written by a commit and `decompress` on every
/// value read from the engine before it is cached or returned.
pub trait Codec: Send + Sync {
    fn compress(&self, value: &[u8]) -> Result<Value>;
    fn decompress(&self, stored: &[u8]) -> Result<Value>;
}

/// Passes values through unchanged. The default codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Codec for Identity {
    fn compress(&self, value: &[u8]) -> Result<Value> {
        Ok(value.to_vec())
    }

    fn decompress(&self, stored: &[u8]) -> Result<Value> {
        Ok(stored.to_vec())
    }
}
