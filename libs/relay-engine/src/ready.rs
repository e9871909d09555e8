use std::future::Future;
use std::time::Duration;

use relay_api::RelayError;

/// Wait until both startup dependencies are ready, in either order.
///
/// Fails as soon as either side fails. With `limit` set, gives up with
/// [`RelayError::ReadyTimeout`]; with `None` it may wait forever.
pub async fn await_ready<A, B, TA, TB>(
    listener: A,
    broker: B,
    limit: Option<Duration>,
) -> Result<(TA, TB), RelayError>
where
    A: Future<Output = Result<TA, RelayError>>,
    B: Future<Output = Result<TB, RelayError>>,
{
    let both = async { tokio::try_join!(listener, broker) };
    match limit {
        Some(limit) => tokio::time::timeout(limit, both)
            .await
            .map_err(|_| RelayError::ReadyTimeout(limit))?,
        None => both.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn resolves_when_both_ready_in_either_order() {
        let (a_tx, a_rx) = oneshot::channel::<u16>();
        let (b_tx, b_rx) = oneshot::channel::<&str>();
        let a = async move { a_rx.await.map_err(|e| RelayError::BrokerUnavailable(e.to_string())) };
        let b = async move { b_rx.await.map_err(|e| RelayError::BrokerUnavailable(e.to_string())) };

        let waiter = tokio::spawn(await_ready(a, b, None));
        b_tx.send("broker").unwrap();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        a_tx.send(7).unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), (7, "broker"));
    }

    #[tokio::test]
    async fn fails_fast_when_one_side_fails() {
        let bind_failed = async {
            Err::<(), _>(RelayError::BrokerAddress("ws://x".into()))
        };
        let never = std::future::pending::<Result<(), RelayError>>();

        let err = await_ready(bind_failed, never, None).await.unwrap_err();
        assert!(matches!(err, RelayError::BrokerAddress(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_broker_never_ready() {
        let listener = async { Ok::<_, RelayError>(()) };
        let broker = std::future::pending::<Result<(), RelayError>>();

        let err = await_ready(listener, broker, Some(Duration::from_secs(30))).await.unwrap_err();
        assert!(matches!(err, RelayError::ReadyTimeout(d) if d == Duration::from_secs(30)));
    }
}
