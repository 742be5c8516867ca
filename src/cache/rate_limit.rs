use redis::AsyncCommands;

use super::RedisHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { count: u64 },
    Limited { count: u64 },
    /// Redis could not be reached; callers let the request through.
    Unavailable,
}

pub fn decide(count: u64, limit: u32) -> RateLimitDecision {
    if count > u64::from(limit) {
        RateLimitDecision::Limited { count }
    } else {
        RateLimitDecision::Allowed { count }
    }
}

/// Counts one request against `key` in a fixed window (`INCR`, then `EXPIRE`
/// on the first hit).
pub async fn hit(
    redis: &RedisHandle,
    key: &str,
    limit: u32,
    window_secs: u64,
) -> RateLimitDecision {
    let mut conn = match redis.connection().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "redis unavailable, rate limit skipped");
            return RateLimitDecision::Unavailable;
        }
    };

    let count: u64 = match conn.incr(key, 1u64).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "rate limit increment failed");
            redis.reset().await;
            return RateLimitDecision::Unavailable;
        }
    };
    if count == 1 {
        let ttl = i64::try_from(window_secs).unwrap_or(60);
        let expired: redis::RedisResult<bool> = conn.expire(key, ttl).await;
        if let Err(e) = expired {
            tracing::warn!(error = %e, "rate limit expire failed");
        }
    }
    decide(count, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_boundary() {
        assert_eq!(decide(1, 20), RateLimitDecision::Allowed { count: 1 });
        assert_eq!(decide(20, 20), RateLimitDecision::Allowed { count: 20 });
        assert_eq!(decide(21, 20), RateLimitDecision::Limited { count: 21 });
    }
}
