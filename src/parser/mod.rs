//! Decoding of fetch responses: header text, Gmail annotations, MIME parts,
//! and the materializer that combines them.

pub mod header;
pub mod message;
pub mod metadata;
pub mod mime;
pub mod mutf7;
