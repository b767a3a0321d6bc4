use std::time::Duration;

macro_rules! assert_approx {
    ($left: expr, $right: expr, $epsilon: expr) => {{
        let dur = match $right.duration_since($left) {
            Ok(dur) => dur,
            Err(e) => e.duration(),
        };

        assert!(dur <= $epsilon)
    }};
}

// A small value to avoid rounding errors of the millisecond representation
pub const EPSILON: Duration = Duration::from_millis(1);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ease::clock::{AdvanceableScheduleClock, SchedulerClock, VirtualClock};
    use ease::utils::local_second;
    use std::sync::Arc;
    use std::time::UNIX_EPOCH;

    #[tokio::test]
    async fn test_initial_epoch() {
        let clock = VirtualClock::from_epoch();
        assert_approx!(clock.now().await, UNIX_EPOCH, EPSILON);
    }

    #[tokio::test]
    async fn test_custom_time() {
        let time0 = UNIX_EPOCH + Duration::from_secs(45);
        let clock = VirtualClock::new(time0);
        assert_approx!(clock.now().await, time0, EPSILON);
    }

    #[tokio::test]
    async fn test_local_time() {
        let local = NaiveDate::from_ymd_opt(2024, 2, 14)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap();
        let clock = VirtualClock::from_local(local);
        assert_eq!(local_second(clock.now().await), local);

        let later = local + chrono::Duration::days(3);
        clock.advance_to_local(later).await;
        assert_eq!(local_second(clock.now().await), later);
    }

    #[tokio::test]
    async fn test_advance() {
        let clock = VirtualClock::from_epoch();
        clock.advance(Duration::from_secs(1)).await;
        assert_eq!(clock.now().await, UNIX_EPOCH + Duration::from_secs(1));
        clock.advance(Duration::from_secs(100)).await;
        assert_eq!(clock.now().await, UNIX_EPOCH + Duration::from_secs(101));
    }

    #[tokio::test]
    async fn test_advance_to() {
        let clock = VirtualClock::from_epoch();
        let target = UNIX_EPOCH + Duration::from_secs(19);
        clock.advance_to(target).await;
        assert_approx!(clock.now().await, target, EPSILON);
        let target = UNIX_EPOCH + Duration::from_secs(235);
        clock.advance_to(target).await;
        assert_approx!(clock.now().await, target, EPSILON);
    }

    #[tokio::test]
    async fn test_idle_to_past_target_returns() {
        let clock = VirtualClock::from_epoch();
        let target = UNIX_EPOCH + Duration::from_secs(5);
        clock.advance(Duration::from_secs(5)).await;
        clock.idle_to(target).await;
        assert_approx!(clock.now().await, target, EPSILON);
    }

    #[tokio::test]
    async fn test_idle_to_wakes_on_advance() {
        let clock = Arc::new(VirtualClock::from_epoch());
        let target = UNIX_EPOCH + Duration::from_secs(10);

        let idler = {
            let clock = clock.clone();
            tokio::spawn(async move { clock.idle_to(target).await })
        };

        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert!(!idler.is_finished());

        clock.advance_to(target).await;
        tokio::time::timeout(Duration::from_secs(5), idler)
            .await
            .expect("idle_to did not wake up")
            .unwrap();
    }
}
