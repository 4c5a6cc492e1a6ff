pub mod attendance;
pub mod error;
pub mod geotime;
pub mod hierarchy;
pub mod leave;
pub mod locks;
pub mod report;
pub mod resolver;
pub mod settings;

use std::future::Future;
use std::time::Duration;

use actix_web::rt::time::timeout;
use chrono::{Local, NaiveDateTime};
use tracing::error;

use self::error::{AttendanceError, EngineResult};

/// Source of "now" in server-local wall time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Runs a store call under `limit`; store failures and timeouts become `Internal`.
pub(crate) async fn bounded<T, F>(limit: Duration, what: &'static str, fut: F) -> EngineResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(error = %e, call = what, "Store call failed");
            Err(AttendanceError::from(e))
        }
        Err(_) => {
            error!(call = what, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AttendanceError::Internal {
                message: format!("{what} timed out"),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::Clock;

    /// Clock that only moves when told to.
    pub struct FixedClock(Mutex<NaiveDateTime>);

    impl FixedClock {
        pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Self {
            let at = NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, 0)
                .unwrap();
            Self(Mutex::new(at))
        }

        pub fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }
}
