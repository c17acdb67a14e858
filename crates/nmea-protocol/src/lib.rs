//! NMEA 0183 Protocol
//!
//! This crate provides decoding of NMEA 0183 marine-instrument sentences and
//! the buffered TCP line stream that feeds the decoder. Decoding is a pure
//! function over one line of text; the stream owns the socket lifecycle and
//! pairs with [`Backoff`] for reconnects.

mod error;
mod reader;
mod sentence;

pub use error::{ConnectionError, ParseError};
pub use reader::{Backoff, SentenceStream};
pub use sentence::{
    checksum, decode, DecodedSentence, DptFields, GgaFields, GllFields, MdaFields, MwvFields,
    RmcFields, SentenceBody, SpeedUnit, VlwFields, WindReference, ZdaFields,
};
