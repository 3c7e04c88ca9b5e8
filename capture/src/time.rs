/// Clock used to stamp page views, injectable so tests can pin it.
pub trait TimeSource {
    // Return the current unix time, in whole seconds
    fn current_time(&self) -> i64;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}
