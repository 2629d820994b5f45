//! Record key generation for INSERT and materializing SELECT.
//!
//! Keys look like `<prefix>:<unix-seconds>-<counter>`. The counter is
//! process-wide, seeded once from a random value on first use and bumped
//! atomically for every key. Uniqueness holds within one process only; two
//! processes writing the same prefix in the same second can collide.

use once_cell::sync::Lazy;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static KEY_COUNTER: Lazy<AtomicU64> =
    Lazy::new(|| AtomicU64::new(rand::thread_rng().gen_range(0..1_000_000)));

/// Generate a fresh key under `prefix`
pub fn generate_key(prefix: &str) -> String {
    let counter = KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}:{}-{}", prefix, chrono::Utc::now().timestamp(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_shape() {
        let key = generate_key("phonebook");
        let rest = key.strip_prefix("phonebook:").unwrap();
        let (ts, counter) = rest.split_once('-').unwrap();
        assert!(ts.parse::<i64>().unwrap() > 0);
        assert!(counter.parse::<u64>().is_ok());
    }

    #[test]
    fn test_keys_are_unique_in_process() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_key("k")).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| generate_key("t")).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        assert_eq!(all.len(), 1000);
    }
}
