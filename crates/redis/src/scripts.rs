// Lua scripts for the three multi-key compound operations. Evaluated
// server-side via `EVAL` so each is atomic with respect to every other
// convoy talking to the same Redis instance.

use redis::Script;

/// KEYS: committed, processing. ARGV: id.
pub fn complete_script() -> Script {
    Script::new(
        r"
        redis.call('SREM', KEYS[1], ARGV[1])
        redis.call('ZREM', KEYS[2], ARGV[1])
        return 1
        ",
    )
}

/// KEYS: committed, processing, failed, errorLog. ARGV: id, score, message, log_ttl_secs.
pub fn fail_script() -> Script {
    Script::new(
        r"
        redis.call('SREM', KEYS[1], ARGV[1])
        redis.call('ZREM', KEYS[2], ARGV[1])
        redis.call('ZADD', KEYS[3], ARGV[2], ARGV[1])
        redis.call('LPUSH', KEYS[4], ARGV[3])
        redis.call('EXPIRE', KEYS[4], ARGV[4])
        return 1
        ",
    )
}

/// KEYS: processing, committed. ARGV: cutoff. Returns the released ids.
pub fn release_stale_script() -> Script {
    Script::new(
        r"
        local stale = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
        for _, id in ipairs(stale) do
            redis.call('ZREM', KEYS[1], id)
            redis.call('SREM', KEYS[2], id)
        end
        return stale
        ",
    )
}
