use crate::clock::TimerClock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::time::Duration;

#[allow(unused_imports)]
use crate::clock::VirtualClock;

/// [`SystemClock`] is an implementation of the [`TimerClock`] trait, it is
/// the default option for listeners, unlike [`VirtualClock`], it moves
/// forward no matter what and cannot be advanced at any arbitrary point (due
/// to its design)
///
/// # Constructor(s)
/// One can simply use the default rust's struct initialization or via
/// [`SystemClock::default`] to construct the [`SystemClock`]
///
/// # Trait Implementation(s)
/// While [`SystemClock`] implements the [`TimerClock`] trait, it also
/// implements the [`Default`] trait, the [`Clone`] trait and the [`Copy`]
/// trait
///
/// # See Also
/// - [`VirtualClock`]
/// - [`TimerClock`]
#[derive(Default, Clone, Copy)]
pub struct SystemClock;

impl Debug for SystemClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SystemClock").field(&Utc::now()).finish()
    }
}

#[async_trait]
impl TimerClock for SystemClock {
    async fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn idle_for(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
