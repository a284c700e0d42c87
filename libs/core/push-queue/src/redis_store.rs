//! Redis-backed job queue.
//!
//! Key layout under the configured prefix `{p}`:
//!
//! | key                                   | type | contents                              |
//! |---------------------------------------|------|---------------------------------------|
//! | `{p}:seq`                             | int  | record id counter                     |
//! | `{p}:record:{rid}`                    | hash | method, interval, recipient, created_at, lock |
//! | `{p}:messages:{rid}`                  | list | message references in arrival order   |
//! | `{p}:pending:{method}:{interval}`     | zset | record ids scored by visible-at (ms)  |
//! | `{p}:open:{method}:{interval}:{rcpt}` | str  | record id still accepting messages    |
//! | `{p}:lock:{job_id}`                   | str  | record id locked under this job id    |
//!
//! All clocks come from Redis `TIME` so lock expiry is consistent across workers.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::job::{Job, JobFilter, JobId};
use crate::queue::JobQueue;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, instrument};

const NOW_MS: &str = r"
local t = redis.call('TIME')
local now = tonumber(t[1]) * 1000 + math.floor(tonumber(t[2]) / 1000)
";

// KEYS: pending, open  ARGV: prefix, method, interval, recipient, message
const ENQUEUE: &str = r"
local rid = redis.call('GET', KEYS[2])
if rid and redis.call('EXISTS', ARGV[1] .. ':record:' .. rid) == 1 then
    local mkey = ARGV[1] .. ':messages:' .. rid
    if not redis.call('LPOS', mkey, ARGV[5]) then
        redis.call('RPUSH', mkey, ARGV[5])
    end
    return 0
end
rid = tostring(redis.call('INCR', ARGV[1] .. ':seq'))
redis.call('HSET', ARGV[1] .. ':record:' .. rid,
    'method', ARGV[2], 'interval', ARGV[3], 'recipient', ARGV[4],
    'created_at', string.format('%.0f', now))
redis.call('RPUSH', ARGV[1] .. ':messages:' .. rid, ARGV[5])
redis.call('ZADD', KEYS[1], now, rid)
redis.call('SET', KEYS[2], rid)
return 1
";

// KEYS: pending  ARGV: prefix, job id, lock ttl ms, method, interval
const PULL: &str = r"
while true do
    local rid = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', now, 'LIMIT', 0, 1)[1]
    if not rid then
        return false
    end
    local rkey = ARGV[1] .. ':record:' .. rid
    if redis.call('EXISTS', rkey) == 0 then
        redis.call('ZREM', KEYS[1], rid)
    else
        local prev = redis.call('HGET', rkey, 'lock')
        if prev then
            redis.call('DEL', ARGV[1] .. ':lock:' .. prev)
        end
        local recipient = redis.call('HGET', rkey, 'recipient')
        local okey = ARGV[1] .. ':open:' .. ARGV[4] .. ':' .. ARGV[5] .. ':' .. recipient
        if redis.call('GET', okey) == rid then
            redis.call('DEL', okey)
        end
        redis.call('ZADD', KEYS[1], now + tonumber(ARGV[3]), rid)
        redis.call('HSET', rkey, 'lock', ARGV[2])
        redis.call('SET', ARGV[1] .. ':lock:' .. ARGV[2], rid)
        local created_at = redis.call('HGET', rkey, 'created_at')
        local messages = redis.call('LRANGE', ARGV[1] .. ':messages:' .. rid, 0, -1)
        return {rid, recipient, created_at, messages}
    end
end
";

// KEYS: lock  ARGV: prefix, job id
const DELETE: &str = r"
local rid = redis.call('GET', KEYS[1])
if not rid then
    return 0
end
redis.call('DEL', KEYS[1])
local rkey = ARGV[1] .. ':record:' .. rid
local f = redis.call('HMGET', rkey, 'method', 'interval', 'recipient', 'lock')
if f[4] ~= ARGV[2] then
    return 0
end
redis.call('ZREM', ARGV[1] .. ':pending:' .. f[1] .. ':' .. f[2], rid)
local okey = ARGV[1] .. ':open:' .. f[1] .. ':' .. f[2] .. ':' .. f[3]
if redis.call('GET', okey) == rid then
    redis.call('DEL', okey)
end
redis.call('DEL', rkey, ARGV[1] .. ':messages:' .. rid)
return 1
";

// KEYS: lock  ARGV: prefix, job id
const RELEASE: &str = r"
local rid = redis.call('GET', KEYS[1])
if not rid then
    return 0
end
redis.call('DEL', KEYS[1])
local rkey = ARGV[1] .. ':record:' .. rid
local f = redis.call('HMGET', rkey, 'method', 'interval', 'lock', 'created_at')
if f[3] ~= ARGV[2] then
    return 0
end
redis.call('HDEL', rkey, 'lock')
redis.call('ZADD', ARGV[1] .. ':pending:' .. f[1] .. ':' .. f[2], f[4], rid)
return 1
";

type PulledRecord = (String, String, String, Vec<String>);

/// Job queue stored in Redis; safe to share between any number of workers.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
    config: QueueConfig,
    enqueue: Script,
    pull: Script,
    delete: Script,
    release: Script,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager, config: QueueConfig) -> Self {
        Self {
            conn,
            config,
            enqueue: Script::new(&format!("{NOW_MS}{ENQUEUE}")),
            pull: Script::new(&format!("{NOW_MS}{PULL}")),
            delete: Script::new(DELETE),
            release: Script::new(RELEASE),
        }
    }

    fn lock_key(&self, job_id: &JobId) -> String {
        format!("{}:lock:{}", self.config.prefix, job_id)
    }
}

fn parse_created_at(record: &str, raw: &str) -> QueueResult<DateTime<Utc>> {
    let millis: i64 = raw
        .parse()
        .map_err(|_| QueueError::corrupt(record, format!("invalid created_at '{raw}'")))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| QueueError::corrupt(record, format!("created_at out of range: {millis}")))
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    #[instrument(skip(self), fields(filter = %filter))]
    async fn pull(&self, job_id: JobId, filter: &JobFilter) -> QueueResult<Option<Job>> {
        let interval = filter.interval.as_ref();
        let mut conn = self.conn.clone();

        let pulled: Option<PulledRecord> = self
            .pull
            .key(self.config.pending_key(&filter.method, interval))
            .arg(&self.config.prefix)
            .arg(job_id.to_string())
            .arg(self.config.lock_ttl_ms())
            .arg(&filter.method)
            .arg(interval)
            .invoke_async(&mut conn)
            .await?;

        let Some((record, recipient, created_at, messages)) = pulled else {
            return Ok(None);
        };

        if messages.is_empty() {
            return Err(QueueError::corrupt(record, "job has no messages"));
        }

        debug!(job_id = %job_id, record = %record, "Locked job");

        Ok(Some(Job {
            id: job_id,
            method: filter.method.clone(),
            interval: filter.interval,
            recipient,
            created_at: parse_created_at(&record, &created_at)?,
            messages,
        }))
    }

    #[instrument(skip(self))]
    async fn delete(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i32 = self
            .delete
            .key(self.lock_key(job_id))
            .arg(&self.config.prefix)
            .arg(job_id.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    /// Re-scores the record at its creation time, so it is visible at once
    /// and keeps its place among older jobs.
    #[instrument(skip(self))]
    async fn release(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.conn.clone();
        let released: i32 = self
            .release
            .key(self.lock_key(job_id))
            .arg(&self.config.prefix)
            .arg(job_id.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(released == 1)
    }

    #[instrument(skip(self), fields(filter = %filter))]
    async fn enqueue(
        &self,
        recipient: &str,
        message_id: &str,
        filter: &JobFilter,
    ) -> QueueResult<()> {
        let interval = filter.interval.as_ref();
        let mut conn = self.conn.clone();

        let created: i32 = self
            .enqueue
            .key(self.config.pending_key(&filter.method, interval))
            .key(self.config.open_key(&filter.method, interval, recipient))
            .arg(&self.config.prefix)
            .arg(&filter.method)
            .arg(interval)
            .arg(recipient)
            .arg(message_id)
            .invoke_async(&mut conn)
            .await?;

        if created == 1 {
            debug!(recipient = %recipient, "Opened new job");
        }
        Ok(())
    }

    async fn pending_count(&self, filter: &JobFilter) -> QueueResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn
            .zcard(self.config.pending_key(&filter.method, filter.interval.as_ref()))
            .await?;
        Ok(count)
    }
}
