//! TypeResolver port - handler が受け取る payload 型の解決
//!
//! 型付き handler（`TypedWholeHandler<T, H>` など）は `T` を静的に知っているので、
//! 既定の [`DeclaredTypeResolver`] はその宣言をそのまま返すだけです。

use crate::domain::payload::PayloadType;
use crate::typed::handler::MessageHandler;

/// TypeResolver は handler の payload 型を返す
///
/// 呼び出し前に registry が handler の呼び出し規約（kind）を確認済みです。
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, handler: &dyn MessageHandler) -> PayloadType;
}

impl<R: TypeResolver + ?Sized> TypeResolver for Box<R> {
    fn resolve(&self, handler: &dyn MessageHandler) -> PayloadType {
        (**self).resolve(handler)
    }
}

/// DeclaredTypeResolver は handler 自身の宣言を使う
///
/// 型を宣言していない手書き handler は [`PayloadType::any`] として扱います。
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredTypeResolver;

impl TypeResolver for DeclaredTypeResolver {
    fn resolve(&self, handler: &dyn MessageHandler) -> PayloadType {
        handler.payload_type().unwrap_or_else(PayloadType::any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryError, HandlerKind};
    use crate::typed::handler::TypedWholeHandler;
    use std::any::Any;

    struct Untyped;

    impl MessageHandler for Untyped {
        fn kind(&self) -> Option<HandlerKind> {
            Some(HandlerKind::WholeMessage)
        }

        fn payload_type(&self) -> Option<PayloadType> {
            None
        }

        fn on_payload(&self, _payload: Box<dyn Any + Send>, _last: bool) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[test]
    fn resolves_declared_type() {
        let handler = TypedWholeHandler::<String, _>::new(|_: String| {});
        assert_eq!(
            DeclaredTypeResolver.resolve(&handler),
            PayloadType::of::<String>()
        );
    }

    #[test]
    fn undeclared_type_falls_back_to_any() {
        assert!(DeclaredTypeResolver.resolve(&Untyped).is_any());
    }
}
