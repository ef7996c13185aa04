//! MessageHandlerRegistry - handler の登録と管理
//!
//! # 学習ポイント
//! - 型消去された trait object (`HandlerRef`) を `PayloadType` キーで管理
//! - 「検証してから変更する」順序で、失敗時に状態を一切変えない
//! - `OnceCell` による遅延キャッシュ（`&self` のまま計算、変更時に `take()` で破棄）
//!
//! registry 自体は同期化されていません。複数スレッドから使う場合は
//! 呼び出し側が 1 つのロックで add / remove / get_all をまとめて守ります
//! （[`crate::app::EndpointSession`] がその例）。

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::classify::{Classification, classify};
use super::handler::{HandlerRef, MessageHandler, PartialMessageHandler, WholeMessageHandler};
use crate::domain::errors::RegistrationError;
use crate::domain::{Category, HandlerKind, Payload, PayloadType};
use crate::ports::{DecoderCatalog, DeclaredTypeResolver, TypeResolver};

/// get_all() が返すスナップショット
///
/// 後から registry を変更しても、既に返したスナップショットは変わりません。
pub type HandlerSnapshot = Arc<HashSet<HandlerRef>>;

/// HandlerRecord は登録済み handler 1 件
#[derive(Debug, Clone)]
pub struct HandlerRecord {
    pub resolved_type: PayloadType,
    pub kind: HandlerKind,
    pub category: Category,
    /// decoder catalog 経由で分類されたか
    pub decoded: bool,
    pub handler: HandlerRef,
}

/// Category ごとの占有フラグ
///
/// whole / partial で slot を分けていないのは意図どおり。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CategorySlots {
    text: bool,
    binary: bool,
    pong: bool,
}

impl CategorySlots {
    fn slot_mut(&mut self, category: Category) -> &mut bool {
        match category {
            Category::Text => &mut self.text,
            Category::Binary => &mut self.binary,
            Category::Pong => &mut self.pong,
        }
    }

    fn is_occupied(&self, category: Category) -> bool {
        match category {
            Category::Text => self.text,
            Category::Binary => self.binary,
            Category::Pong => self.pong,
        }
    }

    fn occupy(&mut self, category: Category) {
        *self.slot_mut(category) = true;
    }

    fn release(&mut self, category: Category) {
        *self.slot_mut(category) = false;
    }
}

/// MessageHandlerRegistry は endpoint session 1 つ分の handler を管理
///
/// # 使用例
/// ```ignore
/// let mut registry = MessageHandlerRegistry::new(DecoderCatalog::empty());
/// let echo = registry.add_whole::<String, _>(|text: String| println!("{text}"))?;
///
/// assert!(registry.is_occupied(Category::Text));
/// registry.remove(&echo);
/// ```
///
/// # 不変条件
/// - 同じ `resolved_type` の record は 1 件まで
/// - 各 Category の record は 1 件まで（whole / partial 共通）
/// - slot のフラグは「その Category の record が存在する」と一致する
pub struct MessageHandlerRegistry {
    records: HashMap<PayloadType, HandlerRecord>,
    slots: CategorySlots,
    decoders: DecoderCatalog,
    resolver: Box<dyn TypeResolver>,
    cache: OnceCell<HandlerSnapshot>,
}

impl MessageHandlerRegistry {
    pub fn new(decoders: DecoderCatalog) -> Self {
        Self::with_resolver(decoders, DeclaredTypeResolver)
    }

    pub fn with_resolver(decoders: DecoderCatalog, resolver: impl TypeResolver + 'static) -> Self {
        Self {
            records: HashMap::new(),
            slots: CategorySlots::default(),
            decoders,
            resolver: Box::new(resolver),
            cache: OnceCell::new(),
        }
    }

    pub fn decoders(&self) -> &DecoderCatalog {
        &self.decoders
    }

    /// handler を登録する
    ///
    /// # Errors
    ///
    /// - `NotAHandler`: 呼び出し規約を宣言していない
    /// - `NoDecoderForType` / `UnsupportedStreamingType`: 分類できない
    /// - `DuplicateCategory`: 同じ Category の handler が登録済み
    /// - `DuplicateType`: 同じ payload 型の handler が登録済み
    ///
    /// 失敗時は何も変更しません。
    pub fn add(&mut self, handler: HandlerRef) -> Result<(), RegistrationError> {
        let record = match self.admit(handler) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "message handler rejected");
                return Err(err);
            }
        };

        debug!(
            category = %record.category,
            kind = %record.kind,
            payload_type = %record.resolved_type,
            decoded = record.decoded,
            "message handler registered"
        );
        self.slots.occupy(record.category);
        self.records.insert(record.resolved_type, record);
        self.cache.take();
        Ok(())
    }

    /// 型付き whole-message handler を登録し、削除用の参照を返す
    pub fn add_whole<T: Payload, H: WholeMessageHandler<T>>(
        &mut self,
        handler: H,
    ) -> Result<HandlerRef, RegistrationError> {
        let handler = HandlerRef::whole::<T, H>(handler);
        self.add(handler.clone())?;
        Ok(handler)
    }

    /// 型付き partial-message handler を登録し、削除用の参照を返す
    pub fn add_partial<T: Payload, H: PartialMessageHandler<T>>(
        &mut self,
        handler: H,
    ) -> Result<HandlerRef, RegistrationError> {
        let handler = HandlerRef::partial::<T, H>(handler);
        self.add(handler.clone())?;
        Ok(handler)
    }

    /// 検証だけを行い、登録する record を組み立てる（状態は変えない）
    fn admit(&self, handler: HandlerRef) -> Result<HandlerRecord, RegistrationError> {
        let kind = handler.kind().ok_or(RegistrationError::NotAHandler)?;
        let resolved_type = self.resolve(handler.as_handler());
        let Classification { category, decoded } = classify(kind, &resolved_type, &self.decoders)?;

        // category の衝突を型の衝突より先に報告する
        if self.slots.is_occupied(category) {
            return Err(RegistrationError::DuplicateCategory(category));
        }
        // 現在の分類表では上の検査で先に弾かれるが、Category が増えた場合に備えて残す
        if self.records.contains_key(&resolved_type) {
            return Err(RegistrationError::DuplicateType(resolved_type));
        }

        Ok(HandlerRecord {
            resolved_type,
            kind,
            category,
            decoded,
            handler,
        })
    }

    fn resolve(&self, handler: &dyn MessageHandler) -> PayloadType {
        self.resolver.resolve(handler)
    }

    /// handler を削除する
    ///
    /// 登録されていない handler を渡しても何もしません（エラーにもなりません）。
    pub fn remove(&mut self, handler: &HandlerRef) {
        let Some(resolved_type) = self
            .records
            .iter()
            .find(|(_, record)| record.handler == *handler)
            .map(|(ty, _)| *ty)
        else {
            return;
        };
        let Some(record) = self.records.remove(&resolved_type) else {
            return;
        };

        // 登録時と同じ分類をやり直して、解放する slot を決める
        let category = match classify(record.kind, &record.resolved_type, &self.decoders) {
            Ok(classification) => classification.category,
            Err(_) => record.category,
        };
        debug_assert_eq!(category, record.category);

        self.slots.release(category);
        self.cache.take();
        debug!(
            category = %category,
            payload_type = %record.resolved_type,
            "message handler removed"
        );
    }

    /// 登録済みの全 handler（キャッシュ済みなら再計算しない）
    pub fn get_all(&self) -> HandlerSnapshot {
        self.cache
            .get_or_init(|| {
                Arc::new(
                    self.records
                        .values()
                        .map(|record| record.handler.clone())
                        .collect(),
                )
            })
            .clone()
    }

    pub fn is_occupied(&self, category: Category) -> bool {
        self.slots.is_occupied(category)
    }

    pub fn record_for(&self, category: Category) -> Option<&HandlerRecord> {
        self.records
            .values()
            .find(|record| record.category == category)
    }

    pub fn handler_for(&self, category: Category) -> Option<HandlerRef> {
        self.record_for(category).map(|record| record.handler.clone())
    }

    /// 占有されている Category の一覧（slot 順）
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.slots.is_occupied(*category))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for MessageHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHandlerRegistry")
            .field("records", &self.records.len())
            .field("slots", &self.slots)
            .field("decoders", &self.decoders.len())
            .field("cached", &self.cache.get().is_some())
            .finish()
    }
}
