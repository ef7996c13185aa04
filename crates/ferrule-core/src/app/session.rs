//! EndpointSession - endpoint 1 接続分の handler 管理と受信メッセージの配送
//!
//! # 学習ポイント
//! - 同期化されていない registry を 1 つの Mutex で守る
//! - handler の呼び出しはロックを外してから行う（handler 内から add / remove できる）
//! - `tracing::Span` を session に持たせて、ログに session id を付ける

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{Span, info_span, warn};

use crate::config::EndpointConfig;
use crate::domain::errors::{DeliveryError, RegistrationError};
use crate::domain::{BinaryStream, Category, PayloadType, PongMessage, SessionId, TextStream};
use crate::typed::{HandlerRef, HandlerSnapshot, MessageHandlerRegistry};

/// ロック中に取り出す配送先
struct Route {
    handler: HandlerRef,
    resolved_type: PayloadType,
    decoded: bool,
}

/// EndpointSession は registry を所有し、受信メッセージを handler に渡す
///
/// # 使用例
/// ```ignore
/// let session = EndpointBuilder::new("/echo")
///     .whole::<String, _>(|text: String| println!("{text}"))
///     .build()?;
///
/// session.on_text("Hello World".to_string(), true)?;
/// ```
pub struct EndpointSession {
    id: SessionId,
    config: EndpointConfig,
    registry: Mutex<MessageHandlerRegistry>,
    span: Span,
}

impl EndpointSession {
    pub fn new(config: EndpointConfig, registry: MessageHandlerRegistry) -> Self {
        let id = SessionId::generate();
        let span = info_span!("endpoint_session", session = %id, path = %config.path);
        Self {
            id,
            config,
            registry: Mutex::new(registry),
            span,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn add_message_handler(&self, handler: HandlerRef) -> Result<(), RegistrationError> {
        let _entered = self.span.enter();
        self.registry.lock().add(handler)
    }

    pub fn remove_message_handler(&self, handler: &HandlerRef) {
        let _entered = self.span.enter();
        self.registry.lock().remove(handler);
    }

    pub fn message_handlers(&self) -> HandlerSnapshot {
        self.registry.lock().get_all()
    }

    pub fn has_handler(&self, category: Category) -> bool {
        self.registry.lock().is_occupied(category)
    }

    /// text メッセージ（または断片）を配送する
    ///
    /// handler の型に合わせて `String` か `TextStream` に変換します。
    pub fn on_text(&self, text: String, last: bool) -> Result<(), DeliveryError> {
        let _entered = self.span.enter();
        self.check_size(Category::Text, text.len())?;
        let route = self.route(Category::Text)?;

        let result = if route.resolved_type == PayloadType::of::<TextStream>() {
            route.handler.deliver(TextStream::from(text), last)
        } else {
            route.handler.deliver(text, last)
        };
        Self::log_failure(Category::Text, result)
    }

    /// binary メッセージ（または断片）を配送する
    ///
    /// handler の型に合わせて `Bytes` / `Vec<u8>` / `BinaryStream` に変換します。
    pub fn on_binary(&self, data: Bytes, last: bool) -> Result<(), DeliveryError> {
        let _entered = self.span.enter();
        self.check_size(Category::Binary, data.len())?;
        let route = self.route(Category::Binary)?;

        let result = if route.resolved_type == PayloadType::of::<Vec<u8>>() {
            route.handler.deliver(data.to_vec(), last)
        } else if route.resolved_type == PayloadType::of::<BinaryStream>() {
            route.handler.deliver(BinaryStream::from(data.to_vec()), last)
        } else {
            route.handler.deliver(data, last)
        };
        Self::log_failure(Category::Binary, result)
    }

    pub fn on_pong(&self, pong: PongMessage) -> Result<(), DeliveryError> {
        let _entered = self.span.enter();
        let route = self.route(Category::Pong)?;
        Self::log_failure(Category::Pong, route.handler.deliver(pong, true))
    }

    fn check_size(&self, category: Category, size: usize) -> Result<(), DeliveryError> {
        match self.config.max_message_size(category) {
            Some(limit) if size > limit => {
                warn!(%category, size, limit, "inbound message too large");
                Err(DeliveryError::MessageTooLarge {
                    category,
                    size,
                    limit,
                })
            }
            _ => Ok(()),
        }
    }

    /// 配送先を取り出す。ロックはこの関数を抜けた時点で外れる。
    fn route(&self, category: Category) -> Result<Route, DeliveryError> {
        let registry = self.registry.lock();
        let record = registry
            .record_for(category)
            .ok_or(DeliveryError::NoHandler(category))?;
        let route = Route {
            handler: record.handler.clone(),
            resolved_type: record.resolved_type,
            decoded: record.decoded,
        };

        // payload のデコードは decoder 側の責務
        if route.decoded {
            return Err(DeliveryError::DecoderRequired(route.resolved_type));
        }
        Ok(route)
    }

    fn log_failure(category: Category, result: Result<(), DeliveryError>) -> Result<(), DeliveryError> {
        if let Err(err) = &result {
            warn!(%category, error = %err, "message delivery failed");
        }
        result
    }
}

impl std::fmt::Debug for EndpointSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSession")
            .field("id", &self.id)
            .field("path", &self.config.path)
            .field("registry", &*self.registry.lock())
            .finish()
    }
}
