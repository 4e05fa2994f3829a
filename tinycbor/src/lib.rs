/*!
A zero-copy, allocation-free CBOR codec for fixed-size buffers.

Parsing is lazy: [`decode::parse`] reads a single item, and arrays, maps and
indefinite-length strings are only walked when handed to the traversal
functions. Encoding writes [`encode::Descriptor`] values into caller-supplied
buffers, and never past their end.
*/
#![cfg_attr(not(any(test, feature = "std")), no_std)]

use tracing::*;

pub mod decode;
pub mod encode;
pub mod float;
pub mod header;

mod decode_seq;

/// A recursion limit for callers with no better figure to hand.
pub const DEFAULT_MAX_RECURSION: usize = 16;
