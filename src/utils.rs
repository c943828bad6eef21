//! 浏览器端的初始化辅助。

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

/// 把 `log` 输出接到浏览器控制台。重复调用无害。
pub fn init_logging() {
    console_log::init_with_level(log::Level::Debug).ok();
}
