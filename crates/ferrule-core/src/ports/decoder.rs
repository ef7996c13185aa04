//! Decoder catalog port - 登録済み decoder の読み取り専用リスト
//!
//! registry は decoder の中身（デコード処理）を知りません。
//! 「どの role で、どの型を生成できるか」という記述子だけを参照します。

use crate::domain::payload::{Payload, PayloadType};
use std::sync::Arc;

/// DecoderRole は decoder の入力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderRole {
    Text,
    TextStream,
    Binary,
    BinaryStream,
}

impl DecoderRole {
    pub fn is_text(&self) -> bool {
        matches!(self, DecoderRole::Text | DecoderRole::TextStream)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, DecoderRole::Binary | DecoderRole::BinaryStream)
    }
}

/// DecoderDescriptor は decoder 1 つ分のメタデータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderDescriptor {
    role: DecoderRole,
    declared_type: PayloadType,
}

impl DecoderDescriptor {
    pub fn new(role: DecoderRole, declared_type: PayloadType) -> Self {
        Self {
            role,
            declared_type,
        }
    }

    pub fn text<T: Payload>() -> Self {
        Self::new(DecoderRole::Text, PayloadType::of::<T>())
    }

    pub fn text_stream<T: Payload>() -> Self {
        Self::new(DecoderRole::TextStream, PayloadType::of::<T>())
    }

    pub fn binary<T: Payload>() -> Self {
        Self::new(DecoderRole::Binary, PayloadType::of::<T>())
    }

    pub fn binary_stream<T: Payload>() -> Self {
        Self::new(DecoderRole::BinaryStream, PayloadType::of::<T>())
    }

    pub fn role(&self) -> DecoderRole {
        self.role
    }

    pub fn declared_type(&self) -> PayloadType {
        self.declared_type
    }

    /// この decoder の出力を `required` 型の handler に渡せるか
    pub fn can_produce(&self, required: &PayloadType) -> bool {
        self.declared_type.is_assignable_from(required)
    }
}

/// DecoderCatalog は順序付きの decoder 記述子リスト
///
/// 構築後は変更できません。clone は `Arc` の共有なので安価です。
#[derive(Debug, Clone, Default)]
pub struct DecoderCatalog {
    decoders: Arc<[DecoderDescriptor]>,
}

impl DecoderCatalog {
    pub fn new(decoders: impl Into<Vec<DecoderDescriptor>>) -> Self {
        let decoders: Vec<DecoderDescriptor> = decoders.into();
        Self {
            decoders: decoders.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecoderDescriptor> {
        self.decoders.iter()
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// 最初に見つかった text / text-stream decoder
    pub fn find_text(&self, required: &PayloadType) -> Option<&DecoderDescriptor> {
        self.iter().find(|d| d.role().is_text() && d.can_produce(required))
    }

    /// 最初に見つかった binary / binary-stream decoder
    pub fn find_binary(&self, required: &PayloadType) -> Option<&DecoderDescriptor> {
        self.iter().find(|d| d.role().is_binary() && d.can_produce(required))
    }
}

impl FromIterator<DecoderDescriptor> for DecoderCatalog {
    fn from_iter<I: IntoIterator<Item = DecoderDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chat;
    impl Payload for Chat {}

    struct Frame;
    impl Payload for Frame {}

    #[test]
    fn roles_split_into_text_and_binary() {
        assert!(DecoderRole::Text.is_text());
        assert!(DecoderRole::TextStream.is_text());
        assert!(DecoderRole::Binary.is_binary());
        assert!(DecoderRole::BinaryStream.is_binary());
        assert!(!DecoderRole::TextStream.is_binary());
        assert!(!DecoderRole::BinaryStream.is_text());
    }

    #[test]
    fn find_text_ignores_binary_decoders() {
        let catalog = DecoderCatalog::new(vec![
            DecoderDescriptor::binary::<Chat>(),
            DecoderDescriptor::text_stream::<Frame>(),
        ]);

        assert!(catalog.find_text(&PayloadType::of::<Chat>()).is_none());
        assert!(catalog.find_binary(&PayloadType::of::<Chat>()).is_some());
        assert!(catalog.find_text(&PayloadType::of::<Frame>()).is_some());
    }

    #[test]
    fn any_decoder_matches_every_type() {
        let catalog: DecoderCatalog = [DecoderDescriptor::new(DecoderRole::Text, PayloadType::any())]
            .into_iter()
            .collect();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.find_text(&PayloadType::of::<Chat>()).is_some());
        assert!(catalog.find_binary(&PayloadType::of::<Chat>()).is_none());
    }

    #[test]
    fn empty_catalog_finds_nothing() {
        let catalog = DecoderCatalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.find_text(&PayloadType::of::<Chat>()).is_none());
    }
}
