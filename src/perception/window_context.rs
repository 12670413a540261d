//! Best-effort window enumeration for prompt context.
//!
//! The agent loop folds a one-line description of the foreground window and
//! the few windows behind it into each planning prompt. Failures here are
//! never surfaced as errors; an empty string simply means no context.

#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub title: String,
    pub is_foreground: bool,
}

/// Maximum number of background window titles included in the context line.
const MAX_BACKGROUND_WINDOWS: usize = 4;

/// A compact description of the visible window stack, e.g.
/// `Active window: Notepad | Behind: Firefox, Explorer`.
pub fn active_window_context() -> String {
    let windows = visible_windows();
    let Some(foreground) = windows.iter().find(|w| w.is_foreground) else {
        return String::new();
    };

    let behind: Vec<&str> = windows
        .iter()
        .filter(|w| !w.is_foreground)
        .take(MAX_BACKGROUND_WINDOWS)
        .map(|w| w.title.as_str())
        .collect();

    if behind.is_empty() {
        format!("Active window: {}", foreground.title)
    } else {
        format!(
            "Active window: {} | Behind: {}",
            foreground.title,
            behind.join(", ")
        )
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::WindowInfo;
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, IsIconic,
        IsWindowVisible, SetForegroundWindow, ShowWindow, SW_RESTORE,
    };

    fn window_title(hwnd: HWND) -> String {
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len == 0 {
                return String::new();
            }
            let mut buf = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buf);
            String::from_utf16_lossy(&buf[..copied as usize])
        }
    }

    unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let out = &mut *(lparam.0 as *mut Vec<(HWND, String)>);
        if IsWindowVisible(hwnd).as_bool() {
            let title = window_title(hwnd);
            if !title.is_empty() {
                out.push((hwnd, title));
            }
        }
        BOOL(1)
    }

    pub fn visible_windows() -> Vec<WindowInfo> {
        let mut raw: Vec<(HWND, String)> = Vec::new();
        unsafe {
            let _ = EnumWindows(Some(enum_proc), LPARAM(&mut raw as *mut _ as isize));
        }
        let foreground = unsafe { GetForegroundWindow() };
        raw.into_iter()
            .map(|(hwnd, title)| WindowInfo {
                title,
                is_foreground: hwnd == foreground,
            })
            .collect()
    }

    pub fn focus_window_by_title(pattern: &str) -> bool {
        let needle = pattern.to_lowercase();
        let mut raw: Vec<(HWND, String)> = Vec::new();
        unsafe {
            let _ = EnumWindows(Some(enum_proc), LPARAM(&mut raw as *mut _ as isize));
        }
        for (hwnd, title) in raw {
            if title.to_lowercase().contains(&needle) {
                unsafe {
                    if IsIconic(hwnd).as_bool() {
                        let _ = ShowWindow(hwnd, SW_RESTORE);
                    }
                    return SetForegroundWindow(hwnd).as_bool();
                }
            }
        }
        false
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use super::WindowInfo;

    pub fn visible_windows() -> Vec<WindowInfo> {
        Vec::new()
    }

    pub fn focus_window_by_title(pattern: &str) -> bool {
        tracing::debug!(pattern, "window focus not supported on this platform");
        false
    }
}

pub use platform::{focus_window_by_title, visible_windows};
