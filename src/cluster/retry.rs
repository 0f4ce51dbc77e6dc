// src/cluster/retry.rs
use std::{thread::sleep, time::Duration};

/// Calls `f` up to `attempts` times with a fixed pause between failures.
///
/// Returns the first success, or the error from the final attempt. There is
/// no pause after the last attempt. `attempts == 0` is treated as one attempt.
pub fn retry<T, E, F>(attempts: u32, delay: Duration, mut f: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match f(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(_) => {
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn returns_first_success() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry(5, Duration::ZERO, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err("not yet")
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn returns_last_failure_after_budget() {
        let mut calls = 0;
        let result: Result<(), String> = retry(4, Duration::ZERO, |attempt| {
            calls += 1;
            Err(format!("attempt {}", attempt))
        });
        assert_eq!(result, Err("attempt 4".to_string()));
        assert_eq!(calls, 4);
    }

    #[test]
    fn does_not_sleep_after_last_attempt() {
        let start = Instant::now();
        let result: Result<(), ()> = retry(1, Duration::from_secs(5), |_| Err(()));
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Result<(), ()> = retry(0, Duration::ZERO, |_| {
            calls += 1;
            Err(())
        });
        assert_eq!(calls, 1);
    }
}
