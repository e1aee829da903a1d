use super::*;

/// # Safety
/// Each test touches only its own variables, so parallel runs do not race.
unsafe fn clear_vars(keys: &[&str]) {
    for key in keys {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__NETMAP_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__NETMAP_TEST_VALID__", "2.5") };
    let val: f64 = env_parse("__NETMAP_TEST_VALID__", 0.0);
    assert!((val - 2.5).abs() < f64::EPSILON);
    unsafe { clear_vars(&["__NETMAP_TEST_VALID__"]) };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__NETMAP_TEST_INVALID__", "wide") };
    let val: u64 = env_parse("__NETMAP_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { clear_vars(&["__NETMAP_TEST_INVALID__"]) };
}

#[test]
fn layout_defaults_match_constants() {
    let cfg = LayoutConfig::default();
    assert!((cfg.column_width - 220.0).abs() < f64::EPSILON);
    assert!((cfg.node_gap_y - 100.0).abs() < f64::EPSILON);
    assert!((cfg.margin_x - DEFAULT_MARGIN_X).abs() < f64::EPSILON);
    assert!((cfg.canvas_height - DEFAULT_CANVAS_HEIGHT).abs() < f64::EPSILON);
}

#[test]
fn layout_from_env_reads_overrides() {
    const KEYS: [&str; 4] = ["NETMAP_MARGIN_X", "NETMAP_CANVAS_HEIGHT", "NETMAP_COLUMN_WIDTH", "NETMAP_NODE_GAP_Y"];
    unsafe {
        clear_vars(&KEYS);
        std::env::set_var("NETMAP_COLUMN_WIDTH", "300");
        std::env::set_var("NETMAP_NODE_GAP_Y", "bogus");
    }

    let cfg = LayoutConfig::from_env();
    assert!((cfg.column_width - 300.0).abs() < f64::EPSILON);
    assert!((cfg.node_gap_y - DEFAULT_NODE_GAP_Y).abs() < f64::EPSILON);
    assert!((cfg.margin_x - DEFAULT_MARGIN_X).abs() < f64::EPSILON);

    unsafe { clear_vars(&KEYS) };
}

#[test]
fn autosave_debounce_defaults_to_two_seconds() {
    assert_eq!(AutoSaveConfig::default().debounce, Duration::from_millis(2000));

    unsafe { std::env::set_var("NETMAP_AUTOSAVE_DEBOUNCE_MS", "250") };
    assert_eq!(AutoSaveConfig::from_env().debounce, Duration::from_millis(250));
    unsafe { clear_vars(&["NETMAP_AUTOSAVE_DEBOUNCE_MS"]) };
}
