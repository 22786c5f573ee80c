/// Current unix time in seconds
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

pub const fn seconds_from_days(days: u32) -> u32 {
    days * 24 * 60 * 60
}
