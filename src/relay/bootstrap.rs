use std::sync::Arc;

use tracing::{error, info};

use crate::{
    application::BrokerConnection,
    config::Settings,
    error::{ConnectionError, RelayError},
    relay::{
        ListenerAdapter, LoopOutcome, NotificationHandler, PublishLoop, Shutdown,
        SubscriptionManager,
    },
};

/// Собранный ретранслятор: все компоненты, созданные в порядке зависимостей.
pub struct Relay {
    channel: String,
    payload: String,
    handler: Arc<NotificationHandler>,
    adapter: ListenerAdapter,
    manager: SubscriptionManager,
    publisher: PublishLoop,
}

impl Relay {
    /// Собирает обработчик, адаптер, контейнер подписок и цикл публикации
    /// поверх готового соединения с брокером.
    pub fn assemble(
        connection: Arc<dyn BrokerConnection>,
        settings: &Settings,
        shutdown: &Shutdown,
    ) -> Self {
        let handler = Arc::new(NotificationHandler::new());
        let adapter = ListenerAdapter::new(settings.listener_name.as_str(), handler.clone());
        // Потеря подписки останавливает цикл публикации через общий сигнал.
        let manager = SubscriptionManager::new(connection.clone())
            .with_drain_timeout(settings.drain_timeout())
            .with_loss_signal(shutdown.clone());
        let publisher = PublishLoop::new(connection, settings.publish_config(), shutdown.listener());

        Self {
            channel: settings.channel.clone(),
            payload: settings.payload.clone(),
            handler,
            adapter,
            manager,
            publisher,
        }
    }

    pub fn handler(&self) -> &Arc<NotificationHandler> {
        &self.handler
    }

    pub fn manager(&self) -> &SubscriptionManager {
        &self.manager
    }

    /// Подписывается, крутит цикл публикации и останавливает подписку.
    ///
    /// Ошибка подписки фатальна: цикл публикации не запускается. Контейнер
    /// подписок останавливается на любом пути выхода, уже после того как
    /// цикл публикации завершился. Если брокер закрыл подписку раньше, чем
    /// пришло уведомление, результатом будет `ConnectionError::Closed`.
    pub async fn run(mut self) -> Result<LoopOutcome, RelayError> {
        if let Err(e) = self
            .manager
            .start(&self.channel, self.adapter.clone())
            .await
        {
            error!(channel = %self.channel, error = %e, "startup failed: no listener");
            self.manager.stop().await;
            return Err(e.into());
        }

        info!(channel = %self.channel, "relay started");
        let outcome = self
            .publisher
            .run(&self.channel, &self.payload, &self.handler)
            .await;
        self.manager.stop().await;

        if matches!(outcome, Ok(LoopOutcome::Cancelled { .. })) && self.manager.connection_lost() {
            error!(channel = %self.channel, "broker closed the subscription before any notification");
            return Err(ConnectionError::Closed.into());
        }

        if let Ok(outcome) = &outcome {
            info!(
                published = outcome.published(),
                received = self.handler.count(),
                "relay finished"
            );
        }
        outcome
    }
}
