use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::Graphics::Dwm::DwmSetWindowAttribute;
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetWindowLongPtrW, SetWindowLongPtrW, SetWindowPos, GWL_EXSTYLE,
    SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW,
};

/// Extract the Win32 HWND from a winit window.
pub fn get_hwnd(window: &winit::window::Window) -> HWND {
    let handle = window.window_handle().expect("window handle unavailable");
    match handle.as_raw() {
        RawWindowHandle::Win32(h) => HWND(h.hwnd.get() as *mut core::ffi::c_void),
        _ => panic!("expected Win32 window handle"),
    }
}

/// Apply overlay window styles for a transparent desktop companion.
pub unsafe fn make_overlay(hwnd: HWND) {
    let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
    log::info!("Window ex-style before: 0x{:08X}", style);

    // Remove WS_EX_LAYERED if present (winit's with_transparent used to set
    // it). Add WS_EX_NOREDIRECTIONBITMAP so DWM does not create a GDI
    // redirection surface — all rendering comes from the DirectComposition
    // visual that wgpu creates via DxgiFromVisual. NOACTIVATE keeps clicks
    // on the sprite from stealing focus; the window itself stays hit-tested
    // so those clicks still arrive.
    const WS_EX_LAYERED: isize = 0x00080000;
    const WS_EX_NOREDIRECTIONBITMAP: isize = 0x00200000;

    let new_style = (style & !WS_EX_LAYERED)
        | WS_EX_NOACTIVATE.0 as isize
        | WS_EX_TOOLWINDOW.0 as isize
        | WS_EX_NOREDIRECTIONBITMAP;
    SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);

    log::info!("Window ex-style after:  0x{:08X}", new_style);

    // Force DWM to recalculate the window frame with the new styles.
    // Without this, DWM may use cached frame info from before our changes.
    let _ = SetWindowPos(
        hwnd,
        HWND::default(),
        0,
        0,
        0,
        0,
        SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
    );

    // DWMWA_NCRENDERING_POLICY(2) = DWMNCRP_DISABLED(2)
    // Removes the 1px border DWM draws around all windows.
    let policy = 2u32;
    let _ = DwmSetWindowAttribute(
        hwnd,
        windows::Win32::Graphics::Dwm::DWMWINDOWATTRIBUTE(2),
        &policy as *const u32 as *const core::ffi::c_void,
        4,
    );

    // DWMWA_WINDOW_CORNER_PREFERENCE(33) = DWMWCP_DONOTROUND(1)
    let corner = 1u32;
    let _ = DwmSetWindowAttribute(
        hwnd,
        windows::Win32::Graphics::Dwm::DWMWINDOWATTRIBUTE(33),
        &corner as *const u32 as *const core::ffi::c_void,
        4,
    );

    // DWMWA_BORDER_COLOR(34) = DWMWA_COLOR_NONE(0xFFFFFFFE)
    let no_border = 0xFFFFFFFEu32;
    let _ = DwmSetWindowAttribute(
        hwnd,
        windows::Win32::Graphics::Dwm::DWMWINDOWATTRIBUTE(34),
        &no_border as *const u32 as *const core::ffi::c_void,
        4,
    );

    // DWMWA_SYSTEMBACKDROP_TYPE(38) = DWMSBT_NONE(1)
    // Disables Mica/Acrylic/glass blur behind the window so the extended
    // DWM frame is truly transparent, not frosted.
    let backdrop = 1u32;
    let _ = DwmSetWindowAttribute(
        hwnd,
        windows::Win32::Graphics::Dwm::DWMWINDOWATTRIBUTE(38),
        &backdrop as *const u32 as *const core::ffi::c_void,
        4,
    );
}

/// Set up the window as a transparent, always-on-top overlay that still
/// receives pointer input.
pub fn setup_overlay(window: &winit::window::Window) {
    let hwnd = get_hwnd(window);
    unsafe {
        make_overlay(hwnd);
    }

    log::info!("Win32 overlay setup complete (DirectComposition + toolwindow, clicks enabled)");
}

/// Get the current global mouse cursor position in screen pixels.
pub fn get_mouse_pos() -> (f32, f32) {
    let mut point = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut point);
    }
    (point.x as f32, point.y as f32)
}
