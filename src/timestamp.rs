/// Length of `frames` frames in seconds; 0 for a non-positive rate.
pub fn frames_to_secs(frames: u64, sample_rate: f64) -> f64 {
    if sample_rate > 0.0 {
        frames as f64 / sample_rate
    } else {
        0.0
    }
}

pub fn time_str(sec: f64) -> String {
    let ms = sec * 1000f64;
    let hours = (ms / 3600000f64) as u64;
    let minutes = ((ms % 3600000f64) / 60000f64) as u64;
    let seconds = ((ms % 60000f64) / 1000f64) as u64;
    let milliseconds = (ms % 1000f64) as u64;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[test]
fn durations() {
    assert_eq!(time_str(frames_to_secs(24000, 48000.0)), "00:00:00.500");
    assert_eq!(time_str(frames_to_secs(44100 * 3725, 44100.0)), "01:02:05.000");
    assert_eq!(frames_to_secs(100, 0.0), 0.0);
}
