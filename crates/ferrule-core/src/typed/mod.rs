//! Typed - 型付き handler API と registry
//!
//! このモジュールは handler が受け取る payload 型を型パラメータで宣言させ、
//! 登録時の分類を静的な型情報だけで行えるようにします。
//!
//! # 二層構造
//! - **表層（Typed）**: `WholeMessageHandler<T>`, `PartialMessageHandler<T>` - 型安全
//! - **内部（Dyn）**: `MessageHandler` trait - object-safe, type erasure

pub mod classify;
pub mod handler;
pub mod registry;

// 主要な trait/型 を再エクスポート
pub use self::classify::{Classification, classify};
pub use self::handler::{
    HandlerRef, MessageHandler, PartialMessageHandler, TypedPartialHandler, TypedWholeHandler,
    WholeMessageHandler,
};
pub use self::registry::{HandlerRecord, HandlerSnapshot, MessageHandlerRegistry};
