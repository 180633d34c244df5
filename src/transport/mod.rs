//! 网络传输层：带超时约束的 HTTP 客户端。
//!
//! HTTP transport for the Messages API.

pub mod http;

pub use http::{BoxError, HttpTransport, TransportError};
