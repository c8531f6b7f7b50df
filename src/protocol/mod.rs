//! RFC 6455 wire format: frames, masking and the client upgrade handshake.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, FrameHeader};
pub use handshake::{ClientHandshake, HandshakeResponse, WS_GUID, compute_accept_key};
pub use mask::apply_mask;
pub use opcode::OpCode;
