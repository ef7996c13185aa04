//! Classification: `(HandlerKind, PayloadType)` → `Category`.
//!
//! 組み込み型の表を先に見て、該当しなければ whole-message handler だけが
//! decoder catalog を探します（text decoder が binary decoder より優先）。

use bytes::Bytes;

use crate::domain::errors::RegistrationError;
use crate::domain::{BinaryStream, Category, HandlerKind, PayloadType, PongMessage, TextStream};
use crate::ports::DecoderCatalog;

/// Classification は分類結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// decoder catalog 経由で分類されたか
    pub decoded: bool,
}

impl Classification {
    fn native(category: Category) -> Self {
        Self {
            category,
            decoded: false,
        }
    }

    fn decoded(category: Category) -> Self {
        Self {
            category,
            decoded: true,
        }
    }
}

fn whole_text_types() -> [PayloadType; 2] {
    [PayloadType::of::<String>(), PayloadType::of::<TextStream>()]
}

fn whole_binary_types() -> [PayloadType; 3] {
    [
        PayloadType::of::<Bytes>(),
        PayloadType::of::<BinaryStream>(),
        PayloadType::of::<Vec<u8>>(),
    ]
}

fn partial_text_type() -> PayloadType {
    PayloadType::of::<String>()
}

fn partial_binary_types() -> [PayloadType; 2] {
    [PayloadType::of::<Bytes>(), PayloadType::of::<Vec<u8>>()]
}

fn pong_type() -> PayloadType {
    PayloadType::of::<PongMessage>()
}

/// handler の呼び出し規約と payload 型から Category を決める
///
/// # Errors
///
/// - `NoDecoderForType`: whole-message で、組み込み型でも decoder 対象でもない
/// - `UnsupportedStreamingType`: partial-message で、String / Bytes / `Vec<u8>` 以外
pub fn classify(
    kind: HandlerKind,
    payload_type: &PayloadType,
    decoders: &DecoderCatalog,
) -> Result<Classification, RegistrationError> {
    match kind {
        HandlerKind::WholeMessage => classify_whole(payload_type, decoders),
        HandlerKind::StreamingMessage => classify_partial(payload_type),
    }
}

fn classify_whole(
    payload_type: &PayloadType,
    decoders: &DecoderCatalog,
) -> Result<Classification, RegistrationError> {
    if whole_text_types().contains(payload_type) {
        return Ok(Classification::native(Category::Text));
    }
    if whole_binary_types().contains(payload_type) {
        return Ok(Classification::native(Category::Binary));
    }
    if *payload_type == pong_type() {
        return Ok(Classification::native(Category::Pong));
    }

    if decoders.find_text(payload_type).is_some() {
        Ok(Classification::decoded(Category::Text))
    } else if decoders.find_binary(payload_type).is_some() {
        Ok(Classification::decoded(Category::Binary))
    } else {
        Err(RegistrationError::NoDecoderForType(*payload_type))
    }
}

fn classify_partial(payload_type: &PayloadType) -> Result<Classification, RegistrationError> {
    if *payload_type == partial_text_type() {
        Ok(Classification::native(Category::Text))
    } else if partial_binary_types().contains(payload_type) {
        Ok(Classification::native(Category::Binary))
    } else {
        Err(RegistrationError::UnsupportedStreamingType(*payload_type))
    }
}
