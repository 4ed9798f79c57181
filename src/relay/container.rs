//! Контейнер слушателей: жизненный цикл подписок и задачи диспетчеризации.
//!
//! На каждую пару (шаблон, адаптер) контейнер держит одну подписку у брокера
//! и одну tokio-задачу, которая по порядку доставки брокера передаёт
//! сообщения в [`ListenerAdapter::dispatch`].
//!
//! Остановка:
//! 1. Подаётся сигнал остановки, задачи дочитывают уже буферизованные
//!    сообщения.
//! 2. Контейнер ждёт все задачи до общего дедлайна `drain_timeout`,
//!    оставшиеся прерываются.
//! 3. Соединение с брокером закрывается в любом случае.
//!
//! Если брокер сам закрыл подписку до `stop`, привязка удаляется, потеря
//! учитывается в [`DispatchStats::lost`] и подаётся сигнал потери
//! соединения (см. [`SubscriptionManager::with_loss_signal`]).

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::{
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    application::BrokerConnection,
    error::{RecvError, SubscriptionError, TryRecvError},
    pubsub::{Message, PatternSubscription},
    relay::{ListenerAdapter, Shutdown, ShutdownListener},
};

/// Ожидание задач диспетчеризации при остановке по умолчанию.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Ключ подписки: (шаблон канала, имя адаптера).
type BindingKey = (Arc<str>, Arc<str>);
type Bindings = DashMap<BindingKey, Option<JoinHandle<()>>>;

/// Метрики диспетчеризации, общие для всех задач контейнера.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Сообщений, переданных слушателю.
    pub delivered: AtomicU64,
    /// Сообщений, которые не удалось разобрать.
    pub malformed: AtomicU64,
    /// Сообщений, потерянных из-за отставания приёмника.
    pub lagged: AtomicU64,
    /// Подписок, закрытых брокером до остановки контейнера.
    pub lost: AtomicU64,
}

impl DispatchStats {
    /// Всего сбоев: битые сообщения, потерянные из-за отставания и
    /// потерянные подписки.
    pub fn fault_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
            + self.lagged.load(Ordering::Relaxed)
            + self.lost.load(Ordering::Relaxed)
    }
}

pub struct SubscriptionManager {
    connection: Arc<dyn BrokerConnection>,
    bindings: Arc<Bindings>,
    shutdown: Shutdown,
    loss_signal: Option<Shutdown>,
    stopped: AtomicBool,
    drain_timeout: Duration,
    stats: Arc<DispatchStats>,
}

/// То, что задача диспетчеризации разделяет с контейнером.
struct DispatchContext {
    key: BindingKey,
    bindings: Arc<Bindings>,
    stats: Arc<DispatchStats>,
    loss_signal: Option<Shutdown>,
}

impl SubscriptionManager {
    pub fn new(connection: Arc<dyn BrokerConnection>) -> Self {
        Self {
            connection,
            bindings: Arc::new(DashMap::new()),
            shutdown: Shutdown::new(),
            loss_signal: None,
            stopped: AtomicBool::new(false),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn with_drain_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Сигнал, который подаётся, когда брокер закрывает подписку до `stop`.
    pub fn with_loss_signal(
        mut self,
        signal: Shutdown,
    ) -> Self {
        self.loss_signal = Some(signal);
        self
    }

    /// Регистрирует адаптер на шаблон канала и запускает диспетчеризацию.
    ///
    /// # Ошибки
    /// - `Duplicate`, если этот адаптер уже подписан на этот шаблон
    /// - `Connection`, если брокер отказал в подписке
    /// - `Stopped`, если контейнер уже остановлен
    pub async fn start(
        &self,
        channel: &str,
        adapter: ListenerAdapter,
    ) -> Result<(), SubscriptionError> {
        if self.is_stopped() {
            return Err(SubscriptionError::Stopped);
        }

        let key: BindingKey = (Arc::from(channel), Arc::from(adapter.name()));
        match self.bindings.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(SubscriptionError::Duplicate {
                    pattern: channel.to_string(),
                    listener: adapter.name().to_string(),
                });
            }
            // Резервируем ключ до завершения подписки.
            Entry::Vacant(slot) => {
                slot.insert(None);
            }
        }

        let subscription = match self.connection.psubscribe(channel).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.bindings.remove(&key);
                error!(channel, listener = adapter.name(), error = %e, "subscribe failed");
                return Err(e.into());
            }
        };

        info!(channel, listener = adapter.name(), "listener subscribed");
        let context = DispatchContext {
            key: key.clone(),
            bindings: self.bindings.clone(),
            stats: self.stats.clone(),
            loss_signal: self.loss_signal.clone(),
        };
        let task = tokio::spawn(dispatch_loop(
            subscription,
            adapter,
            self.shutdown.listener(),
            context,
        ));
        if let Some(mut slot) = self.bindings.get_mut(&key) {
            *slot = Some(task);
        }
        Ok(())
    }

    /// Останавливает диспетчеризацию и закрывает соединение с брокером.
    ///
    /// Повторный вызов ничего не делает.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.trigger();

        let tasks: Vec<(BindingKey, JoinHandle<()>)> = self
            .bindings
            .iter_mut()
            .filter_map(|mut entry| {
                let key = entry.key().clone();
                entry.value_mut().take().map(|task| (key, task))
            })
            .collect();
        self.bindings.clear();

        let deadline = Instant::now() + self.drain_timeout;
        for ((pattern, listener), mut task) in tasks {
            match timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => debug!(%pattern, %listener, "dispatch task drained"),
                Ok(Err(e)) => error!(%pattern, %listener, error = %e, "dispatch task failed"),
                Err(_) => {
                    warn!(
                        %pattern,
                        %listener,
                        timeout_ms = self.drain_timeout.as_millis() as u64,
                        "dispatch task did not drain in time, aborting"
                    );
                    task.abort();
                }
            }
        }

        self.connection.close().await;
        info!(
            delivered = self.delivered_count(),
            faults = self.fault_count(),
            "subscription manager stopped"
        );
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Количество активных подписок.
    pub fn subscription_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn delivered_count(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    pub fn fault_count(&self) -> u64 {
        self.stats.fault_count()
    }

    /// Брокер закрыл хотя бы одну подписку до остановки контейнера.
    pub fn connection_lost(&self) -> bool {
        self.stats.lost.load(Ordering::Relaxed) > 0
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown.trigger();
        for mut entry in self.bindings.iter_mut() {
            if let Some(task) = entry.value_mut().take() {
                task.abort();
            }
        }
        if !self.is_stopped() {
            warn!("SubscriptionManager dropped without stop(); broker connection left open");
        }
    }
}

async fn dispatch_loop(
    mut subscription: PatternSubscription,
    adapter: ListenerAdapter,
    mut shutdown: ShutdownListener,
    context: DispatchContext,
) {
    let stats = &context.stats;
    loop {
        tokio::select! {
            biased;
            received = subscription.recv() => match received {
                Ok(message) => deliver(&adapter, &message, stats),
                Err(RecvError::Lagged(missed)) => record_lag(&adapter, missed, stats),
                Err(RecvError::Closed) if shutdown.is_triggered() => {
                    debug!(listener = adapter.name(), "subscription closed during shutdown");
                    return;
                }
                Err(RecvError::Closed) => {
                    record_loss(&adapter, &context);
                    return;
                }
            },
            _ = shutdown.triggered() => break,
        }
    }

    // Дочитываем то, что брокер уже доставил.
    loop {
        match subscription.try_recv() {
            Ok(message) => deliver(&adapter, &message, stats),
            Err(TryRecvError::Lagged(missed)) => record_lag(&adapter, missed, stats),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn deliver(
    adapter: &ListenerAdapter,
    message: &Message,
    stats: &DispatchStats,
) {
    match adapter.dispatch(message) {
        Ok(()) => {
            stats.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            stats.malformed.fetch_add(1, Ordering::Relaxed);
            error!(listener = adapter.name(), error = %e, "dropping malformed notification");
        }
    }
}

fn record_lag(
    adapter: &ListenerAdapter,
    missed: u64,
    stats: &DispatchStats,
) {
    stats.lagged.fetch_add(missed, Ordering::Relaxed);
    warn!(listener = adapter.name(), missed, "dispatch lagged behind broker");
}

fn record_loss(
    adapter: &ListenerAdapter,
    context: &DispatchContext,
) {
    context.stats.lost.fetch_add(1, Ordering::Relaxed);
    context.bindings.remove(&context.key);
    error!(
        pattern = %context.key.0,
        listener = adapter.name(),
        "broker closed the subscription, listener lost"
    );
    if let Some(signal) = &context.loss_signal {
        signal.trigger();
    }
}
