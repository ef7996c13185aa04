//! App - アプリケーション層
//!
//! registry と ports を組み合わせて endpoint session を組み立てます。
//!
//! # 主要コンポーネント
//! - **EndpointBuilder**: decoder / handler / 期待 Category の宣言と起動時検証
//! - **EndpointSession**: registry を 1 つのロックで守り、受信メッセージを配送する

pub mod builder;
pub mod session;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, EndpointBuilder};
pub use self::session::EndpointSession;
