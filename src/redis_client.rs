use redis::{aio::MultiplexedConnection, Client, RedisResult};

/// Connection to the task queue broker. The broker is only ever touched
/// through push/pop list semantics.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn new(broker_url: &str) -> RedisResult<Self> {
        let client = Client::open(broker_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(RedisClient { conn })
    }

    /// Push a serialized job onto the named queue.
    pub async fn push_job(&self, queue: &str, payload: &str) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(queue)
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
    }

    /// Blocking pop from the named queue. Returns `None` when the timeout
    /// elapses without a job arriving.
    pub async fn pop_job(&self, queue: &str, timeout_secs: u64) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(queue)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, payload)| payload))
    }
}
