//! Errors - 登録エラーと配送エラー
//!
//! 登録エラーはアプリケーションの起動コードが同期的に受け取ります。
//! リトライはしません（宣言的な 1 回限りの操作なので）。

use super::category::Category;
use super::payload::PayloadType;

/// RegistrationError は handler 登録の拒否理由
///
/// どの variant で失敗しても registry の状態は呼び出し前のままです。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("message handler must be a whole-message or a partial-message handler")]
    NotAHandler,

    #[error("{0} message handler already registered")]
    DuplicateCategory(Category),

    #[error("message handler for type {0} already registered")]
    DuplicateType(PayloadType),

    #[error("decoder for type {0} has not been registered")]
    NoDecoderForType(PayloadType),

    #[error("partial message handler can't be of type {0}")]
    UnsupportedStreamingType(PayloadType),
}

/// DeliveryError は受信メッセージを handler に渡せなかった理由
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("no {0} message handler registered")]
    NoHandler(Category),

    #[error("payload does not match handler type {expected}")]
    PayloadMismatch { expected: PayloadType },

    #[error("whole message handler for {0} can't receive a partial message")]
    FragmentForWholeHandler(PayloadType),

    #[error("message for type {0} must be decoded before delivery")]
    DecoderRequired(PayloadType),

    #[error("{category} message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        category: Category,
        size: usize,
        limit: usize,
    },
}
