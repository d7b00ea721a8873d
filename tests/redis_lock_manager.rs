// Requires a running Redis: REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored

use std::time::Duration;

use order_locking::lock::{LockConfig, LockError, LockManager, RedisLockManager};
use uuid::Uuid;

async fn manager() -> RedisLockManager {
    manager_with(LockConfig::default()).await
}

async fn manager_with(config: LockConfig) -> RedisLockManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let prefix = format!("lock-test-{}", Uuid::new_v4());
    RedisLockManager::connect(&url, config.with_key_prefix(prefix))
        .await
        .expect("Redis should be reachable")
}

#[tokio::test]
#[ignore]
async fn redis_lock_is_exclusive_until_released() {
    let manager = manager().await;

    let first = manager.try_lock("Order", "10").await.unwrap();
    assert!(matches!(
        manager.try_lock("Order", "10").await,
        Err(LockError::Unavailable { .. })
    ));
    assert!(manager.try_lock("Order", "11").await.is_ok());

    manager.check_lock(&first).await.unwrap();
    manager.release_lock(&first).await.unwrap();

    assert_eq!(manager.check_lock(&first).await, Err(LockError::Invalid(first)));
    assert_eq!(manager.release_lock(&first).await, Err(LockError::Invalid(first)));
    assert!(manager.try_lock("Order", "10").await.is_ok());
}

#[tokio::test]
#[ignore]
async fn redis_lock_extension_moves_expiration() {
    let manager = manager().await;

    let lock_id = manager.try_lock("Order", "20").await.unwrap();
    let before = manager.lock_info(&lock_id).await.unwrap();

    manager
        .extend_lock_expiration(&lock_id, Duration::from_secs(30))
        .await
        .unwrap();

    let after = manager.lock_info(&lock_id).await.unwrap();
    assert_eq!(after.subject, before.subject);
    assert_eq!(after.expires_at - before.expires_at, chrono::TimeDelta::seconds(30));
}

#[tokio::test]
#[ignore]
async fn redis_abandoned_lock_stays_expired_after_relock() {
    let manager = manager_with(
        LockConfig::default()
            .with_ttl(Duration::from_millis(200))
            .with_retention(Duration::from_millis(1)),
    )
    .await;

    let abandoned = manager.try_lock("Order", "30").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(matches!(
        manager.check_lock(&abandoned).await,
        Err(LockError::Expired { .. })
    ));

    let fresh = manager.try_lock("Order", "30").await.unwrap();
    assert!(matches!(
        manager.check_lock(&abandoned).await,
        Err(LockError::Expired { .. })
    ));

    manager.release_lock(&abandoned).await.unwrap();
    assert!(manager.check_lock(&fresh).await.is_ok());
}
