//! EndpointBuilder - endpoint session の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - decoder catalog は registry 構築時に固定されるので、handler の登録は build() で行う

use crate::config::EndpointConfig;
use crate::domain::errors::RegistrationError;
use crate::domain::{Category, Payload};
use crate::ports::{DecoderCatalog, DecoderDescriptor, DeclaredTypeResolver, TypeResolver};
use crate::typed::{HandlerRef, MessageHandlerRegistry, PartialMessageHandler, WholeMessageHandler};

use super::session::EndpointSession;

/// EndpointBuilder は EndpointSession を構築
///
/// # 使用例
/// ```ignore
/// let session = EndpointBuilder::new("/chat")
///     .decoder(DecoderDescriptor::text::<ChatMessage>())
///     .whole::<ChatMessage, _>(ChatHandler)
///     .partial::<Vec<u8>, _>(UploadHandler)
///     .expect_categories(&[Category::Text, Category::Binary])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - handler は追加順に登録し、最初の登録エラーで BuildError を返す
/// - expect_categories() で設定した Category に handler がなければ BuildError を返す
pub struct EndpointBuilder {
    config: EndpointConfig,
    decoders: Vec<DecoderDescriptor>,
    handlers: Vec<HandlerRef>,
    resolver: Option<Box<dyn TypeResolver>>,
}

/// BuildError は endpoint 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("handler registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Missing handlers for categories: {0:?}. These categories were expected but not registered.")]
    MissingCategories(Vec<Category>),
}

impl EndpointBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self::from_config(EndpointConfig::new(path))
    }

    pub fn from_config(config: EndpointConfig) -> Self {
        Self {
            config,
            decoders: Vec::new(),
            handlers: Vec::new(),
            resolver: None,
        }
    }

    /// decoder 記述子を catalog の末尾に追加
    pub fn decoder(mut self, decoder: DecoderDescriptor) -> Self {
        self.decoders.push(decoder);
        self
    }

    pub fn resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn handler(mut self, handler: HandlerRef) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn whole<T: Payload, H: WholeMessageHandler<T>>(self, handler: H) -> Self {
        self.handler(HandlerRef::whole::<T, H>(handler))
    }

    pub fn partial<T: Payload, H: PartialMessageHandler<T>>(self, handler: H) -> Self {
        self.handler(HandlerRef::partial::<T, H>(handler))
    }

    /// 必須の Category を設定（config の expected_categories に追加）
    pub fn expect_categories(mut self, categories: &[Category]) -> Self {
        for category in categories {
            if !self.config.expected_categories.contains(category) {
                self.config.expected_categories.push(*category);
            }
        }
        self
    }

    /// EndpointBuilder を構築して EndpointSession を生成
    ///
    /// # 検証
    /// - 全 handler が登録できること
    /// - expected_categories の全 Category に handler があること
    pub fn build(self) -> Result<EndpointSession, BuildError> {
        let decoders = DecoderCatalog::new(self.decoders);
        let mut registry = match self.resolver {
            Some(resolver) => MessageHandlerRegistry::with_resolver(decoders, resolver),
            None => MessageHandlerRegistry::with_resolver(decoders, DeclaredTypeResolver),
        };

        for handler in self.handlers {
            registry.add(handler)?;
        }

        let missing: Vec<Category> = self
            .config
            .expected_categories
            .iter()
            .filter(|category| !registry.is_occupied(**category))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingCategories(missing));
        }

        Ok(EndpointSession::new(self.config, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PayloadType, PongMessage};
    use crate::typed::MessageHandler;

    struct ChatMessage;
    impl Payload for ChatMessage {}

    /// 全 handler を ChatMessage として扱う resolver
    struct AlwaysChat;

    impl TypeResolver for AlwaysChat {
        fn resolve(&self, _handler: &dyn MessageHandler) -> PayloadType {
            PayloadType::of::<ChatMessage>()
        }
    }

    #[test]
    fn test_build_success() {
        let session = EndpointBuilder::new("/echo")
            .whole::<String, _>(|_: String| {})
            .whole::<PongMessage, _>(|_: PongMessage| {})
            .expect_categories(&[Category::Text, Category::Pong])
            .build()
            .unwrap();

        assert_eq!(session.config().path, "/echo");
        assert_eq!(session.message_handlers().len(), 2);
    }

    #[test]
    fn test_build_missing_categories() {
        let result = EndpointBuilder::new("/echo")
            .whole::<String, _>(|_: String| {})
            .expect_categories(&[Category::Text, Category::Binary, Category::Pong])
            .build();

        assert!(matches!(
            result,
            Err(BuildError::MissingCategories(missing)) if missing == vec![Category::Binary, Category::Pong]
        ));
    }

    #[test]
    fn test_build_registration_error() {
        let result = EndpointBuilder::new("/echo")
            .whole::<String, _>(|_: String| {})
            .partial::<String, _>(|_: String, _: bool| {})
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Registration(RegistrationError::DuplicateCategory(Category::Text)))
        ));
    }

    #[test]
    fn test_decoders_are_fixed_before_registration() {
        // decoder を handler より後に追加しても build() 時には catalog に入っている
        let session = EndpointBuilder::new("/chat")
            .whole::<ChatMessage, _>(|_: ChatMessage| {})
            .decoder(DecoderDescriptor::binary::<ChatMessage>())
            .build()
            .unwrap();

        assert!(session.has_handler(Category::Binary));
    }

    #[test]
    fn test_custom_resolver() {
        let result = EndpointBuilder::new("/chat")
            .resolver(AlwaysChat)
            .whole::<String, _>(|_: String| {})
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Registration(RegistrationError::NoDecoderForType(ty))) if ty == PayloadType::of::<ChatMessage>()
        ));
    }

    #[test]
    fn test_expectations_from_config() {
        let config = EndpointConfig {
            expected_categories: vec![Category::Pong],
            ..EndpointConfig::new("/health")
        };
        let result = EndpointBuilder::from_config(config).build();
        assert!(matches!(result, Err(BuildError::MissingCategories(missing)) if missing == vec![Category::Pong]));
    }
}
