//! NAL-level video framing shared by capture and controller hosts (§4.3).

pub mod codec;
pub mod nal;
pub mod param_set;
pub mod relay;

pub use codec::{classify, detect_codec, Codec, NalKind};
pub use nal::{split_annexb, NalUnit};
pub use param_set::{FormatDescription, ParameterSetCache};
pub use relay::annexb_to_length_prefixed;
