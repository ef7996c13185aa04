//! ferrule-core
//!
//! WebSocket 風 endpoint のための message handler registry。
//!
//! # モジュール構成
//! - **domain**: 値型（Category, HandlerKind, PayloadType, SessionId, errors）
//! - **ports**: 外部の協力者（DecoderCatalog, TypeResolver）
//! - **typed**: 型付き handler API と MessageHandlerRegistry
//! - **app**: EndpointBuilder, EndpointSession
//! - **config**: EndpointConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod typed;

pub use self::app::{BuildError, EndpointBuilder, EndpointSession};
pub use self::config::{ConfigError, EndpointConfig};
pub use self::domain::{
    Category, DeliveryError, HandlerKind, Payload, PayloadType, PongMessage, RegistrationError,
};
pub use self::typed::{HandlerRef, MessageHandlerRegistry};
