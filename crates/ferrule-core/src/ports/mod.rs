//! Ports - registry が依存する外部の協力者
//!
//! - **DecoderCatalog**: decoder 記述子の読み取り専用リスト
//! - **TypeResolver**: handler の payload 型を解決する

pub mod decoder;
pub mod type_resolver;

// 主要な型を再エクスポート
pub use self::decoder::{DecoderCatalog, DecoderDescriptor, DecoderRole};
pub use self::type_resolver::{DeclaredTypeResolver, TypeResolver};
