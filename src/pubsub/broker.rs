use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::{intern_channel, Message, PatternSubscription, Subscription};

type ChannelKey = Arc<str>;

/// Отправитель для шаблонной подписки вместе со скомпилированным matcher'ом,
/// чтобы не компилировать glob на каждую публикацию.
struct PatternEntry {
    matcher: GlobMatcher,
    tx: broadcast::Sender<Message>,
}

/// Внутрипроцессный брокер Pub/Sub сообщений.
///
/// Поддерживает:
/// - Точные подписки по имени канала
/// - Подписки по шаблонам (glob)
/// - Автоматическое удаление пустых каналов
/// - Статистику публикаций и ошибок отправки
/// - Закрытие: после `close` все подписки получают `Closed`
pub struct Broker {
    /// Точные каналы → `Sender`
    channels: DashMap<ChannelKey, broadcast::Sender<Message>>,
    /// Шаблоны каналов → `Sender`
    patterns: DashMap<Glob, PatternEntry>,
    /// Ёмкость буфера каждого `broadcast::channel`
    default_capacity: usize,
    closed: AtomicBool,
    /// Общее количество вызовов `publish`
    pub publish_count: AtomicUsize,
    /// Количество неудачных `send` (нет подписчиков)
    pub send_error_count: AtomicUsize,
}

impl Broker {
    /// Создаёт новый `Broker` с заданной буферной ёмкостью.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            patterns: DashMap::new(),
            default_capacity: default_capacity.max(1),
            closed: AtomicBool::new(false),
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
        }
    }

    /// Подписка по шаблону (glob), например `"chat"`, `"chat.*"` или `"a?c"`.
    ///
    /// Повторная подписка на тот же шаблон разделяет один `Sender`.
    pub fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<PatternSubscription, globset::Error> {
        let glob = Glob::new(pattern)?;
        let rx = self
            .patterns
            .entry(glob.clone())
            .or_insert_with(|| PatternEntry {
                matcher: glob.compile_matcher(),
                tx: broadcast::channel(self.default_capacity).0,
            })
            .tx
            .subscribe();
        debug!(pattern, "pattern subscription registered");
        Ok(PatternSubscription::new(glob, rx))
    }

    /// Отписка от шаблона. Удаляет `Sender`, подписчики получат `Closed`.
    pub fn punsubscribe(
        &self,
        pattern: &str,
    ) -> Result<(), globset::Error> {
        let glob = Glob::new(pattern)?;
        self.patterns.remove(&glob);
        Ok(())
    }

    /// Подписка на конкретный канал (точное совпадение).
    pub fn subscribe(
        &self,
        channel: &str,
    ) -> Subscription {
        let key = intern_channel(channel);
        let rx = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(self.default_capacity).0)
            .subscribe();
        Subscription {
            channel: key,
            inner: rx,
        }
    }

    /// Публикация сообщения в канал.
    ///
    /// Работает в два этапа:
    /// 1. Отправляет в точный канал (если есть)
    /// 2. Отправляет всем подписчикам по подходящим шаблонам
    ///
    /// Возвращает количество получателей, до которых дошло сообщение.
    /// Если в точном канале нет подписчиков — увеличивает `send_error_count`
    /// и удаляет канал.
    pub fn publish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> usize {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
        // Сообщение (и interned имя канала) создаётся только при наличии
        // получателя, иначе пул имён рос бы от публикаций в пустоту.
        let mut msg: Option<Message> = None;
        let mut message = || {
            msg.get_or_insert_with(|| Message::new(channel, payload.clone()))
                .clone()
        };
        let mut delivered = 0;

        // 1) точное совпадение
        let mut stale = false;
        if let Some(tx) = self.channels.get(channel) {
            match tx.send(message()) {
                Ok(n) => delivered += n,
                Err(_) => {
                    self.send_error_count.fetch_add(1, Ordering::Relaxed);
                    stale = true;
                }
            }
        }
        if stale {
            self.channels.remove_if(channel, |_, tx| tx.receiver_count() == 0);
        }

        // 2) по шаблону
        for entry in self.patterns.iter() {
            if entry.matcher.is_match(channel) {
                delivered += entry.tx.send(message()).unwrap_or(0);
            }
        }

        trace!(channel, delivered, "message published");
        delivered
    }

    /// Удаляет все подписки на указанный канал (и сам канал).
    pub fn unsubscribe_all(
        &self,
        channel: &str,
    ) {
        self.channels.remove(channel);
    }

    /// Закрывает брокер: удаляет все каналы и шаблоны.
    ///
    /// Все активные подписки после вычитывания буфера получат `Closed`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.channels.clear();
            self.patterns.clear();
            debug!("broker closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Количество активных шаблонных подписок (уникальных шаблонов).
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
