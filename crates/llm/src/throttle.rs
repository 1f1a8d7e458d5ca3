//! Caps how many LLM calls run concurrently across all agents in a session,
//! so a burst of simultaneous question-generation attempts doesn't hammer
//! the backend.

use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

const DEFAULT_MAX_CONCURRENT: usize = 2;

#[derive(Clone)]
pub struct LlmThrottle {
    semaphore: Arc<Semaphore>,
}

impl Default for LlmThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

impl LlmThrottle {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore
            .acquire()
            .await
            .expect("throttle semaphore is never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn third_call_waits_for_a_slot() {
        let throttle = LlmThrottle::new(2);
        let _a = throttle.acquire().await;
        let _b = throttle.acquire().await;

        let blocked = timeout(Duration::from_millis(50), throttle.acquire()).await;
        assert!(blocked.is_err(), "third acquire should block while two permits are held");
    }

    #[tokio::test]
    async fn releasing_a_permit_unblocks_a_waiter() {
        let throttle = LlmThrottle::new(1);
        let permit = throttle.acquire().await;
        drop(permit);

        let acquired = timeout(Duration::from_millis(50), throttle.acquire()).await;
        assert!(acquired.is_ok());
    }
}
