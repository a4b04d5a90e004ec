use chrono::Utc;

/// Current Unix time in milliseconds, truncated to the 32 bits RTMP
/// timestamps carry
pub fn current_timestamp() -> u32 {
    Utc::now().timestamp_millis() as u32
}

/// Current Unix time in seconds
pub fn current_timestamp_secs() -> u32 {
    Utc::now().timestamp() as u32
}
