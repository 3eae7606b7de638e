//! `subscribeEvents` RPC method implementation.

use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage};
use tracing::warn;

use super::KernelState;
use crate::rpc::SubscribeEventsParams;

impl KernelState {
    pub(super) async fn subscribe_events_impl(
        &self,
        pending: PendingSubscriptionSink,
        params: SubscribeEventsParams,
    ) -> SubscriptionResult {
        let mut subscription = self.events.subscribe(params.session_id, params.branch_id, params.after);
        let sink = pending.accept().await?;

        tokio::spawn(async move {
            while let Some(envelope) = subscription.recv().await {
                match SubscriptionMessage::from_json(&envelope) {
                    Ok(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => warn!(%error, "failed to serialize event envelope"),
                }
            }
        });

        Ok(())
    }
}
