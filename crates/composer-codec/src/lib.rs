//! Identifier codec for the layer composer.
//!
//! A composite id is a 256-bit integer holding, most significant first:
//!
//! ```text
//! | pad:8 | slot 1:24 | slot 2:24 | ... | slot 9:24 | base id:32 |
//! ```
//!
//! Each slot field stores the `[item][selector]` bytes of its layer value;
//! the slot byte is implied by position and restored on decode. `encode`
//! and `decode` are inverses for every well-formed input.
//!
//! ```rust
//! use composer_codec::{decode, encode};
//! use composer_types::{BaseId, Layers};
//!
//! let layers = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0x090109]);
//! let id = encode(BaseId::new(0xffff_ffcc), &layers).unwrap();
//! assert_eq!(
//!     id.to_hex(),
//!     "0x00000101000000000000000000000000000000000000000000000901ffffffcc"
//! );
//! assert_eq!(decode(id), (BaseId::new(0xffff_ffcc), layers));
//! ```

pub mod codec;
pub mod error;

pub use codec::{
    decode, encode, field_offset, is_canonical, pack_layer, unpack_layer, BASE_ID_BITS,
    LAYER_FIELD_BITS, PACKED_BITS,
};
pub use error::CodecError;
