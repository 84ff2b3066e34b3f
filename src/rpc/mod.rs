//! Stdio JSON-RPC protocol client for external tool servers.
//!
//! - `framing`: `Content-Length` length-prefixed frame codec
//! - `client`: `StdioClient` connection (pending map, timeouts, handshake)
//! - `wrapper`: `RpcToolWrapper` exposing remote tools as local `Tool`s

pub mod client;
pub mod framing;
pub mod wrapper;

pub use client::{ConnectionState, RemoteToolDef, StdioClient};
pub use framing::{encode_frame, FrameDecoder};
pub use wrapper::{load_server_tools, RpcToolWrapper, ServerSpec};
