//! Category / HandlerKind - 受信メッセージの分類
//!
//! # 学習ポイント
//! - 閉じた enum による分類（match の網羅性チェック）
//! - serde の rename_all で設定ファイルと同じ表記にそろえる

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category は handler が受け取るメッセージの種類
///
/// whole-message と partial-message は同じ slot を共有します。
/// Text handler は「whole の Text」か「partial の Text」のどちらか 1 つだけ登録できます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Binary,
    Pong,
}

impl Category {
    /// All categories, in slot order.
    pub const ALL: [Category; 3] = [Category::Text, Category::Binary, Category::Pong];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Binary => "binary",
            Category::Pong => "pong",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HandlerKind は handler の呼び出し規約
///
/// - `WholeMessage`: 組み立て済みのメッセージを 1 回で受け取る
/// - `StreamingMessage`: 断片を順に受け取る（最後の断片で `last == true`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    WholeMessage,
    StreamingMessage,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::WholeMessage => f.write_str("whole"),
            HandlerKind::StreamingMessage => f.write_str("partial"),
        }
    }
}
