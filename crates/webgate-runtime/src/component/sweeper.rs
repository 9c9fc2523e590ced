use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::WebComponent;

/// Spawn a background task that settles overdue decisions every `interval`.
///
/// The task holds only a weak reference and stops once the component is torn
/// down or dropped.
pub fn spawn_expiry_sweeper(component: &WebComponent, interval: Duration) -> JoinHandle<()> {
    let weak = component.downgrade();
    let component_id = component.id().to_owned();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.is_torn_down() {
                break;
            }
            let expired = inner.guard.expire_overdue();
            if !expired.is_empty() {
                debug!(
                    component = %component_id,
                    count = expired.len(),
                    "Sweeper expired decisions"
                );
            }
        }
        info!(component = %component_id, "Expiry sweeper stopped");
    })
}
