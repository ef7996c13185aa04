//! Handler trait - 受信メッセージを処理する handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (`WholeMessageHandler<T>`, `PartialMessageHandler<T>`)
//! - Object-safe trait (`MessageHandler`)
//! - Type erasure パターン (`TypedWholeHandler<T, H>` → `dyn MessageHandler`)
//! - `Arc` のポインタ同一性による handler の識別 (`HandlerRef`)

use crate::domain::errors::DeliveryError;
use crate::domain::{HandlerKind, Payload, PayloadType};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// WholeMessageHandler は組み立て済みのメッセージを 1 回で受け取る
///
/// # 使用例
/// ```ignore
/// struct Echo;
///
/// impl WholeMessageHandler<String> for Echo {
///     fn on_message(&self, message: String) {
///         println!("received: {message}");
///     }
/// }
/// ```
///
/// クロージャ `Fn(T)` もそのまま handler として使えます。
pub trait WholeMessageHandler<T: Payload>: Send + Sync + 'static {
    fn on_message(&self, message: T);
}

/// PartialMessageHandler はメッセージの断片を順に受け取る
///
/// 最後の断片では `last == true` になります。
pub trait PartialMessageHandler<T: Payload>: Send + Sync + 'static {
    fn on_message(&self, partial: T, last: bool);
}

impl<T: Payload, F> WholeMessageHandler<T> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn on_message(&self, message: T) {
        self(message)
    }
}

impl<T: Payload, F> PartialMessageHandler<T> for F
where
    F: Fn(T, bool) + Send + Sync + 'static,
{
    fn on_message(&self, partial: T, last: bool) {
        self(partial, last)
    }
}

/// MessageHandler は object-safe な handler の抽象化
///
/// registry はこの trait object だけを扱います。
/// 型付き handler は [`TypedWholeHandler`] / [`TypedPartialHandler`] で包まれてここに来ます。
///
/// 手書きで実装する場合、`kind()` が `None` の handler は登録できません。
pub trait MessageHandler: Send + Sync + 'static {
    /// 呼び出し規約。どちらでもなければ `None`。
    fn kind(&self) -> Option<HandlerKind>;

    /// 宣言された payload 型。宣言がなければ `None`。
    fn payload_type(&self) -> Option<PayloadType>;

    /// 型消去された payload を受け取る
    fn on_payload(&self, payload: Box<dyn Any + Send>, last: bool) -> Result<(), DeliveryError>;
}

pub struct TypedWholeHandler<T: Payload, H: WholeMessageHandler<T>> {
    handler: H,
    // fn(T) にしておくと T が Sync でなくても Send + Sync のまま
    _marker: PhantomData<fn(T)>,
}

impl<T: Payload, H: WholeMessageHandler<T>> TypedWholeHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<T: Payload, H: WholeMessageHandler<T>> MessageHandler for TypedWholeHandler<T, H> {
    fn kind(&self) -> Option<HandlerKind> {
        Some(HandlerKind::WholeMessage)
    }

    fn payload_type(&self) -> Option<PayloadType> {
        Some(PayloadType::of::<T>())
    }

    fn on_payload(&self, payload: Box<dyn Any + Send>, last: bool) -> Result<(), DeliveryError> {
        if !last {
            return Err(DeliveryError::FragmentForWholeHandler(PayloadType::of::<T>()));
        }
        let message = payload
            .downcast::<T>()
            .map_err(|_| DeliveryError::PayloadMismatch {
                expected: PayloadType::of::<T>(),
            })?;
        self.handler.on_message(*message);
        Ok(())
    }
}

pub struct TypedPartialHandler<T: Payload, H: PartialMessageHandler<T>> {
    handler: H,
    _marker: PhantomData<fn(T)>,
}

impl<T: Payload, H: PartialMessageHandler<T>> TypedPartialHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<T: Payload, H: PartialMessageHandler<T>> MessageHandler for TypedPartialHandler<T, H> {
    fn kind(&self) -> Option<HandlerKind> {
        Some(HandlerKind::StreamingMessage)
    }

    fn payload_type(&self) -> Option<PayloadType> {
        Some(PayloadType::of::<T>())
    }

    fn on_payload(&self, payload: Box<dyn Any + Send>, last: bool) -> Result<(), DeliveryError> {
        let partial = payload
            .downcast::<T>()
            .map_err(|_| DeliveryError::PayloadMismatch {
                expected: PayloadType::of::<T>(),
            })?;
        self.handler.on_message(*partial, last);
        Ok(())
    }
}

/// HandlerRef は registry に登録される handler への共有参照
///
/// 等値性とハッシュは `Arc` のポインタ同一性で決まります。
/// 同じ型・同じ中身の handler でも、別々に作ったものは別の handler です。
#[derive(Clone)]
pub struct HandlerRef(Arc<dyn MessageHandler>);

impl HandlerRef {
    pub fn new(handler: impl MessageHandler) -> Self {
        Self(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn MessageHandler>) -> Self {
        Self(handler)
    }

    /// 型付き whole-message handler を包む
    pub fn whole<T: Payload, H: WholeMessageHandler<T>>(handler: H) -> Self {
        Self::new(TypedWholeHandler::<T, H>::new(handler))
    }

    /// 型付き partial-message handler を包む
    pub fn partial<T: Payload, H: PartialMessageHandler<T>>(handler: H) -> Self {
        Self::new(TypedPartialHandler::<T, H>::new(handler))
    }

    pub fn kind(&self) -> Option<HandlerKind> {
        self.0.kind()
    }

    pub fn payload_type(&self) -> Option<PayloadType> {
        self.0.payload_type()
    }

    pub fn as_handler(&self) -> &dyn MessageHandler {
        self.0.as_ref()
    }

    /// payload を handler に渡す（型が違えば `PayloadMismatch`）
    pub fn deliver<T: Payload>(&self, payload: T, last: bool) -> Result<(), DeliveryError> {
        self.0.on_payload(Box::new(payload), last)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for HandlerRef {}

impl Hash for HandlerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("kind", &self.kind())
            .field("payload_type", &self.payload_type())
            .field("addr", &self.addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl WholeMessageHandler<String> for Recorder {
        fn on_message(&self, message: String) {
            self.seen.lock().push(message);
        }
    }

    #[test]
    fn whole_handler_receives_final_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = HandlerRef::whole::<String, _>(Recorder { seen: seen.clone() });

        handler.deliver("Hello World".to_string(), true).unwrap();

        assert_eq!(handler.kind(), Some(HandlerKind::WholeMessage));
        assert_eq!(handler.payload_type(), Some(PayloadType::of::<String>()));
        assert_eq!(*seen.lock(), vec!["Hello World".to_string()]);
    }

    #[test]
    fn whole_handler_rejects_fragments() {
        let handler = HandlerRef::whole::<String, _>(|_: String| {});
        let err = handler.deliver("part".to_string(), false).unwrap_err();
        assert_eq!(
            err,
            DeliveryError::FragmentForWholeHandler(PayloadType::of::<String>())
        );
    }

    #[test]
    fn partial_handler_receives_every_fragment() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = HandlerRef::partial::<Vec<u8>, _>(move |part: Vec<u8>, last: bool| {
            sink.lock().push((part, last));
        });

        handler.deliver(vec![1u8, 2], false).unwrap();
        handler.deliver(vec![3u8], true).unwrap();

        assert_eq!(handler.kind(), Some(HandlerKind::StreamingMessage));
        assert_eq!(*seen.lock(), vec![(vec![1, 2], false), (vec![3], true)]);
    }

    #[test]
    fn wrong_payload_type_is_rejected() {
        let handler = HandlerRef::whole::<String, _>(|_: String| {});
        let err = handler.deliver(vec![0u8], true).unwrap_err();
        assert!(matches!(err, DeliveryError::PayloadMismatch { expected } if expected == PayloadType::of::<String>()));
    }

    #[test]
    fn equality_is_identity() {
        let a = HandlerRef::whole::<String, _>(|_: String| {});
        let b = HandlerRef::whole::<String, _>(|_: String| {});

        assert_eq!(a, a.clone());
        assert_ne!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a.clone());
        set.insert(a.clone());
        set.insert(b);
        assert_eq!(set.len(), 2);
    }
}
