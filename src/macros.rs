/// Operator-facing progress line on stdout, prefixed with the local time.
/// Pass a starting time first and the line also reports the elapsed time.
/// ```
/// # use ratings_scrape::info_time;
/// info_time!("Downloading page {} of {}", 1, 3);
/// let time = chrono::Local::now();
/// info_time!(time, "Parsed page {}", 1);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        println!("{:<30} : {}", local_now.format("%Y-%m-%d %H:%M:%S%.3f"), format!($strfm, $($arg),*));
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let run_time = (local_now - $time)
                .num_milliseconds()
                .max(0) as f64 / 1_000.0;
        println!(
            "{:<30} : {} ({})",
            local_now.format("%Y-%m-%d %H:%M:%S%.3f"),
            format!($strfm, $($arg),*),
            $crate::process::pretty_seconds(run_time)
        );
    }};
}
