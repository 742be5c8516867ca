use retreat_backend::cache::{
    RedisHandle,
    rate_limit::{RateLimitDecision, hit},
    redis_health_check,
};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires redis"]
async fn test_rate_limit_window() {
    let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    assert!(redis_health_check(&client).await.unwrap());
    let redis = RedisHandle::new(client);

    let key = format!("rate_limit:test:{}", Uuid::new_v4());
    for expected in 1..=3u64 {
        assert_eq!(
            hit(&redis, &key, 3, 60).await,
            RateLimitDecision::Allowed { count: expected }
        );
    }
    assert_eq!(
        hit(&redis, &key, 3, 60).await,
        RateLimitDecision::Limited { count: 4 }
    );
}

#[tokio::test]
async fn test_rate_limit_fails_open_without_redis() {
    let redis = RedisHandle::new(redis::Client::open("redis://127.0.0.1:1/").unwrap());
    assert_eq!(
        hit(&redis, "rate_limit:offline", 1, 60).await,
        RateLimitDecision::Unavailable
    );
    // A failed connect is not kept; the next call retries.
    assert_eq!(
        hit(&redis, "rate_limit:offline", 1, 60).await,
        RateLimitDecision::Unavailable
    );
}
