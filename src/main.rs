// Prevents an extra console window on Windows in release builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    match aim_lens_lib::run() {
        Ok(Some(summary)) => {
            log::info!(
                "Final Accuracy: {:.2}% ({}/{} clicks)",
                summary.accuracy,
                summary.state.accurate_clicks,
                summary.state.total_clicks
            );
        }
        Ok(None) => {}
        Err(e) => {
            log::error!("{}", e);
            eprintln!("aim-lens: {}", e);
            std::process::exit(1);
        }
    }
}
