//! Payload - handler が受け取る payload 型の表現
//!
//! # 学習ポイント
//! - `std::any::TypeId` による実行時の型識別
//! - Rust には継承がないため、「上位型」を trait の関連関数で明示的に宣言する
//!
//! decoder の宣言型が handler の型を受け入れられるか（上位型または同一か）は
//! [`PayloadType::is_assignable_from`] で判定します。

use bytes::Bytes;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{self, Read};

/// Payload は handler が受け取れる型
///
/// # 使用例
/// ```ignore
/// struct ChatMessage { body: String }
///
/// impl Payload for ChatMessage {
///     fn supertypes() -> Vec<PayloadType> {
///         vec![PayloadType::of::<Envelope>()]
///     }
/// }
/// ```
pub trait Payload: Any + Send + 'static {
    /// この型を「代入できる」直接の上位型。既定では空。
    fn supertypes() -> Vec<PayloadType> {
        Vec::new()
    }
}

/// PayloadType は payload 型の実行時記述子
///
/// 等値性とハッシュは `TypeId` のみで決まります（名前は表示用）。
#[derive(Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<PayloadType>,
}

impl PayloadType {
    pub fn of<T: Payload>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            supertypes: <T as Payload>::supertypes,
        }
    }

    /// The top type: every payload type is assignable to it.
    pub fn any() -> Self {
        Self::of::<AnyPayload>()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<AnyPayload>()
    }

    /// `other` の値をこの型として扱えるか
    ///
    /// - 同一型なら true
    /// - `self` が [`AnyPayload`] なら true
    /// - それ以外は `other` の上位型を推移的にたどる
    pub fn is_assignable_from(&self, other: &PayloadType) -> bool {
        if self.is_any() {
            return true;
        }

        let mut seen = HashSet::new();
        let mut pending = vec![*other];
        while let Some(candidate) = pending.pop() {
            if candidate.id == self.id {
                return true;
            }
            if seen.insert(candidate.id) {
                pending.extend((candidate.supertypes)());
            }
        }
        false
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl Hash for PayloadType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayloadType").field(&self.name).finish()
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ========================================
// 組み込みの payload 型
// ========================================

/// AnyPayload は全ての payload 型の上位型（マーカー、値は作れない）
#[derive(Debug)]
pub enum AnyPayload {}

impl Payload for AnyPayload {}

/// Character sequence.
impl Payload for String {}

/// Raw byte array.
impl Payload for Vec<u8> {}

/// Binary buffer.
impl Payload for Bytes {}

/// TextStream は text メッセージを読み出すストリーム
pub struct TextStream {
    inner: Box<dyn Read + Send>,
}

impl TextStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(reader),
        }
    }

    /// 残りを全て読み出して文字列にする
    pub fn read_to_string(mut self) -> io::Result<String> {
        let mut buf = String::new();
        self.inner.read_to_string(&mut buf)?;
        Ok(buf)
    }
}

impl From<String> for TextStream {
    fn from(text: String) -> Self {
        Self::new(io::Cursor::new(text.into_bytes()))
    }
}

impl Read for TextStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for TextStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextStream").finish_non_exhaustive()
    }
}

impl Payload for TextStream {}

/// BinaryStream は binary メッセージを読み出すストリーム
pub struct BinaryStream {
    inner: Box<dyn Read + Send>,
}

impl BinaryStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(reader),
        }
    }

    pub fn read_to_end(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl From<Vec<u8>> for BinaryStream {
    fn from(data: Vec<u8>) -> Self {
        Self::new(io::Cursor::new(data))
    }
}

impl Read for BinaryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for BinaryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryStream").finish_non_exhaustive()
    }
}

impl Payload for BinaryStream {}

/// PongMessage は pong 制御フレームの中身
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PongMessage {
    application_data: Bytes,
}

impl PongMessage {
    pub fn new(application_data: impl Into<Bytes>) -> Self {
        Self {
            application_data: application_data.into(),
        }
    }

    pub fn application_data(&self) -> &Bytes {
        &self.application_data
    }
}

impl Payload for PongMessage {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Envelope;
    impl Payload for Envelope {}

    struct Greeting;
    impl Payload for Greeting {
        fn supertypes() -> Vec<PayloadType> {
            vec![PayloadType::of::<Envelope>()]
        }
    }

    struct FormalGreeting;
    impl Payload for FormalGreeting {
        fn supertypes() -> Vec<PayloadType> {
            vec![PayloadType::of::<Greeting>()]
        }
    }

    // 上位型の宣言が循環していても判定は止まる
    struct Ouroboros;
    impl Payload for Ouroboros {
        fn supertypes() -> Vec<PayloadType> {
            vec![PayloadType::of::<Ouroboros>()]
        }
    }

    #[test]
    fn equality_ignores_everything_but_type_id() {
        assert_eq!(PayloadType::of::<String>(), PayloadType::of::<String>());
        assert_ne!(PayloadType::of::<String>(), PayloadType::of::<Vec<u8>>());
    }

    #[test]
    fn assignability_is_reflexive_and_follows_supertypes() {
        let envelope = PayloadType::of::<Envelope>();
        let greeting = PayloadType::of::<Greeting>();
        let formal = PayloadType::of::<FormalGreeting>();

        assert!(greeting.is_assignable_from(&greeting));
        assert!(envelope.is_assignable_from(&greeting));
        assert!(envelope.is_assignable_from(&formal));
        assert!(!greeting.is_assignable_from(&envelope));
        assert!(!formal.is_assignable_from(&greeting));
    }

    #[test]
    fn any_accepts_everything() {
        let any = PayloadType::any();
        assert!(any.is_any());
        assert!(any.is_assignable_from(&PayloadType::of::<String>()));
        assert!(any.is_assignable_from(&PayloadType::of::<Greeting>()));
        assert!(!PayloadType::of::<String>().is_assignable_from(&any));
    }

    #[test]
    fn cyclic_supertypes_terminate() {
        let cyclic = PayloadType::of::<Ouroboros>();
        assert!(!PayloadType::of::<Envelope>().is_assignable_from(&cyclic));
    }

    #[test]
    fn streams_read_back_their_content() {
        let text = TextStream::from("Hello World".to_string());
        assert_eq!(text.read_to_string().unwrap(), "Hello World");

        let data = BinaryStream::from(vec![1, 2, 3]);
        assert_eq!(data.read_to_end().unwrap(), vec![1, 2, 3]);
    }
}
