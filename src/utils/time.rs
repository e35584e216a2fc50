/// Test duration: 1.2 minutes per question, rounded up.
pub fn test_duration_minutes(question_count: usize) -> i64 {
    (question_count as f64 * 1.2).ceil() as i64
}

/// Render a second count as HH:MM:SS for history views.
pub fn format_time(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
