use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_locking::common::Money;
use order_locking::domain::order::{
    Address, Order, OrderCommand, OrderEvent, OrderLine, OrderNo, OrderService, Orderer, PlaceOrder, Receiver,
    ServiceError, ShippingInfo,
};
use order_locking::infrastructure::core::AggregateRoot;
use order_locking::infrastructure::dispatch::BroadcastEventDispatcher;
use order_locking::infrastructure::store::{InMemoryRepository, Repository};
use order_locking::lock::{InMemoryLockManager, LockConfig, LockManager, RedisLockManager};
use order_locking::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_locking=debug"))
        )
        .init();

    tracing::info!("Starting order locking demo");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Lock manager: Redis when REDIS_URL is set, in-process otherwise ===
    let lock_config = LockConfig::from_env();
    let lock_manager: Arc<dyn LockManager> = match std::env::var("REDIS_URL") {
        Ok(url) => {
            tracing::info!("Using Redis lock store");
            Arc::new(RedisLockManager::connect(&url, lock_config).await?.with_metrics(metrics.clone()))
        }
        Err(_) => {
            tracing::info!("Using in-memory lock store");
            let manager = InMemoryLockManager::new(lock_config).with_metrics(metrics.clone());
            manager.spawn_sweeper(Duration::from_secs(60));
            Arc::new(manager)
        }
    };

    // === 3. Repository and event dispatcher ===
    let repository: Arc<dyn Repository<Order>> = Arc::new(InMemoryRepository::<Order>::new());
    let dispatcher = BroadcastEventDispatcher::<OrderEvent>::default();

    let mut events = dispatcher.subscribe();
    let subscriber = tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            tracing::info!(
                event_type = %envelope.event_type,
                order_number = %envelope.aggregate_id,
                version = envelope.sequence_number,
                "Received event"
            );
        }
    });

    let service = OrderService::new(repository, lock_manager, Arc::new(dispatcher))
        .with_metrics(metrics.clone());

    // === 4. Place an order ===
    let number = OrderNo::new("10")?;
    let order = service
        .place_order(PlaceOrder::new(
            number.clone(),
            Orderer::new("member-1", "Demo Customer")?,
            vec![
                OrderLine::new("product-1", Money::new(1000), 2)?,
                OrderLine::new("product-2", Money::new(500), 1)?,
            ],
            shipping_info("Demo Customer", "Main Street 1"),
        ))
        .await?;

    tracing::info!(order_number = %order.number(), total = %order.total_amounts(), "Order created");

    // === 5. Pessimistic edit session ===
    let session = service.begin_edit(&number).await?;

    match service.begin_edit(&number).await {
        Err(ServiceError::Lock(e)) => tracing::info!(error = %e, "Second editor refused as expected"),
        Ok(_) => anyhow::bail!("second edit session should have been refused"),
        Err(e) => return Err(e.into()),
    }

    service
        .execute_locked(
            &session.lock_id,
            &number,
            session.order.version(),
            &OrderCommand::ChangeShippingInfo {
                shipping_info: shipping_info("Demo Customer", "Harbor Road 9"),
            },
        )
        .await?;
    service.end_edit(&session.lock_id).await?;

    // === 6. Optimistic update with the version the caller saw ===
    let current = service.load(&number).await?;
    let shipped = service.start_shipping(&number, current.version()).await?;
    tracing::info!(state = ?shipped.state(), version = shipped.version(), "Shipping started");

    if let Err(e) = service.cancel(&number, shipped.version()).await {
        tracing::info!(error = %e, "Cancel after shipping refused as expected");
    }

    // Let the subscriber drain before exiting
    tokio::time::sleep(Duration::from_millis(100)).await;
    subscriber.abort();

    tracing::info!(
        families = metrics.registry().gather().len(),
        "Demo complete"
    );

    Ok(())
}

fn shipping_info(receiver: &str, street: &str) -> ShippingInfo {
    ShippingInfo::new(
        Receiver {
            name: receiver.to_string(),
            phone: "555-0100".to_string(),
        },
        Address {
            zip_code: "10001".to_string(),
            address1: street.to_string(),
            address2: String::new(),
        },
        None,
    )
}
