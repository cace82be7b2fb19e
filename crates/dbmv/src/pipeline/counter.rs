use tokio::sync::Mutex;

/// Rows committed across every worker, checked against the run's ceiling.
///
/// A worker reserves room for a batch before writing it. The ceiling check
/// and the increment happen under one lock, so a reservation is refused
/// once the total has reached the ceiling and the final total exceeds it
/// by less than one batch.
#[derive(Debug)]
pub struct GlobalInsertCounter {
    count: Mutex<u64>,
    max_rows: u64,
}

impl GlobalInsertCounter {
    pub fn new(max_rows: u64) -> Self {
        Self {
            count: Mutex::new(0),
            max_rows,
        }
    }

    pub async fn get(&self) -> u64 {
        *self.count.lock().await
    }

    /// Claim `rows` under the ceiling. Returns the new total, or `None`
    /// when the ceiling is already reached.
    pub async fn try_reserve(&self, rows: u64) -> Option<u64> {
        let mut count = self.count.lock().await;
        if *count >= self.max_rows {
            return None;
        }
        *count += rows;
        Some(*count)
    }

    /// Give back a reservation whose batch was not written.
    pub async fn release(&self, rows: u64) {
        let mut count = self.count.lock().await;
        *count = count.saturating_sub(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reserve_until_reached() {
        let counter = GlobalInsertCounter::new(5);
        assert_eq!(counter.try_reserve(3).await, Some(3));
        assert_eq!(counter.try_reserve(3).await, Some(6));
        assert_eq!(counter.try_reserve(1).await, None);
        assert_eq!(counter.get().await, 6);
    }

    #[tokio::test]
    async fn test_release_reopens_room() {
        let counter = GlobalInsertCounter::new(4);
        assert_eq!(counter.try_reserve(4).await, Some(4));
        counter.release(4).await;
        assert_eq!(counter.get().await, 0);
        assert_eq!(counter.try_reserve(2).await, Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_stop_at_ceiling() {
        let counter = Arc::new(GlobalInsertCounter::new(100));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let mut granted = 0u64;
                while counter.try_reserve(3).await.is_some() {
                    granted += 3;
                }
                granted
            }));
        }
        let mut granted = 0;
        for handle in handles {
            granted += handle.await.unwrap();
        }
        // refused at 100 or more, so at most one batch past the ceiling
        assert_eq!(granted, counter.get().await);
        assert!((100..103).contains(&granted));
    }
}
