//! HTTP body framing for request payloads.
//!
//! # Components
//!
//! - [`LengthDecoder`](length_decoder::LengthDecoder): Processes fixed-length payloads
//! - [`PayloadDecoder`]: Selects the decoding strategy from the parsed header
//!
//! Decoders never consume bytes beyond the declared body, so whatever is left
//! in the read buffer afterwards is the start of the next request.

mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
