#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = linebot_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must also convert into tracker tuning.
        let _ = linebot_core::TrackerCfg::from(&cfg);
    }
    for token in data.split([',', '\n']) {
        let _ = linebot_config::parse_bitmap(token);
    }
});
