//! # rotel-parser
//!
//! Framing and parsing for the Rotel ASCII control protocol.
//!
//! Devices push terminator-delimited status lines made of comma separated
//! `key=value` assignments, for example `power=on,volume=45$`. This crate turns
//! the raw byte stream into [`DeviceMessage`]s in two steps:
//!
//! 1. [`LineFramer`] accumulates received chunks and splits off one frame per
//!    receive terminator, regardless of how the stream was chunked.
//! 2. [`parse_line`] decodes a single frame into a case-folded key/value map.
//!
//! ## Usage
//!
//! ```rust
//! use rotel_parser::{parse_line, LineFramer};
//!
//! let mut framer = LineFramer::new("$");
//! framer.push(b"power=on,vol");
//! framer.push(b"ume=45$mute=off$");
//!
//! let frames: Vec<String> = framer.drain().collect();
//! assert_eq!(frames, vec!["power=on,volume=45", "mute=off"]);
//!
//! let message = parse_line(&frames[0], "$").unwrap();
//! assert_eq!(message.get("volume"), Some("45"));
//! ```

pub mod error;
pub mod framing;
pub mod message;

pub use error::{ParseError, ParseResult};
pub use framing::{LineFramer, DEFAULT_MAX_BUFFER};
pub use message::{parse_line, DeviceMessage};
