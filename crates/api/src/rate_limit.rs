use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window limiter keyed by caller IP. Every `allow` call prunes
/// timestamps that fell out of the window and drops clients whose queue
/// emptied, so idle callers do not accumulate in the map.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock();

        clients.retain(|_, hits| {
            while hits
                .front()
                .is_some_and(|hit| now.duration_since(*hit) > self.window)
            {
                hits.pop_front();
            }
            !hits.is_empty()
        });

        let hits = clients.entry(key.to_string()).or_default();
        if hits.len() >= self.max_requests {
            return false;
        }

        hits.push_back(now);
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
