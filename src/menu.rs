//! Right-click context menu for the pet window.
//! Uses the Win32 popup menu API directly — no extra crate needed. A hidden
//! message-only window owns the menu and receives its WM_COMMAND, which is
//! picked up by polling once per tick.

#[cfg(windows)]
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
    GetCursorPos, PostMessageW, RegisterClassW, SetForegroundWindow, TrackPopupMenu, CS_HREDRAW,
    CS_VREDRAW, HMENU, MF_SEPARATOR, MF_STRING, TPM_BOTTOMALIGN, TPM_LEFTALIGN, WM_COMMAND,
    WM_DESTROY, WNDCLASSW, WS_EX_TOOLWINDOW,
};

use crate::pet::MenuCommand;

/// First character menu item id; character index = id - base.
#[cfg(windows)]
const ID_CHARACTER_BASE: u16 = 1;
/// Quit menu item id.
#[cfg(windows)]
const ID_QUIT: u16 = 1000;

/// Context menu state: one entry per character, then Quit.
pub struct PetMenu {
    #[cfg(windows)]
    names: Vec<String>,
    #[cfg(windows)]
    hwnd: HWND,
    #[cfg(windows)]
    pending: Option<MenuCommand>,
}

#[cfg(windows)]
impl PetMenu {
    pub fn new(names: Vec<String>) -> Self {
        unsafe {
            // Register a hidden window class for receiving menu messages.
            let class_name: Vec<u16> = "DeskPetMenuClass\0".encode_utf16().collect();
            let wc = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(menu_wnd_proc),
                lpszClassName: windows::core::PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };
            RegisterClassW(&wc);

            // Create a hidden message-only window to own the popup.
            use windows::Win32::Foundation::HINSTANCE;
            let hwnd = CreateWindowExW(
                WS_EX_TOOLWINDOW,
                windows::core::PCWSTR(class_name.as_ptr()),
                windows::core::PCWSTR::null(),
                Default::default(),
                0,
                0,
                0,
                0,
                HWND::default(),
                HMENU::default(),
                HINSTANCE::default(),
                None,
            )
            .expect("failed to create menu message window");

            log::info!("context menu ready with {} character(s)", names.len());

            Self {
                names,
                hwnd,
                pending: None,
            }
        }
    }

    /// Pop the menu at the cursor. Blocks until the user picks or dismisses;
    /// the selection surfaces through [`poll`](Self::poll) on the next tick.
    pub fn show(&mut self) {
        unsafe {
            show_context_menu(self.hwnd, &self.names);
        }
    }

    /// Poll for a menu selection. Call once per tick.
    pub fn poll(&mut self) -> Option<MenuCommand> {
        unsafe {
            // Process any pending messages for our hidden window.
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, PeekMessageW, TranslateMessage, PM_REMOVE,
            };
            let mut msg = std::mem::zeroed();
            while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                // Selections arrive as posted WM_COMMAND; consume them here
                // instead of dispatching, or the wndproc would repost forever.
                if msg.message == WM_COMMAND {
                    let id = (msg.wParam.0 & 0xFFFF) as u16;
                    self.pending = self.command_for(id);
                    continue;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        self.pending.take()
    }

    fn command_for(&self, id: u16) -> Option<MenuCommand> {
        if id == ID_QUIT {
            return Some(MenuCommand::Quit);
        }
        let index = id.checked_sub(ID_CHARACTER_BASE)? as usize;
        self.names
            .get(index)
            .map(|name| MenuCommand::SwitchCharacter(name.clone()))
    }
}

#[cfg(windows)]
impl Drop for PetMenu {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Window procedure for the hidden menu message window.
#[cfg(windows)]
unsafe extern "system" fn menu_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_COMMAND {
        // Post back to self so poll() picks it up via PeekMessage
        let _ = PostMessageW(hwnd, WM_COMMAND, wparam, LPARAM(0));
        return LRESULT(0);
    }
    if msg == WM_DESTROY {
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Build and track the popup at the cursor position.
#[cfg(windows)]
unsafe fn show_context_menu(hwnd: HWND, names: &[String]) {
    let hmenu = CreatePopupMenu().expect("failed to create popup menu");

    for (index, name) in names.iter().enumerate() {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let _ = AppendMenuW(
            hmenu,
            MF_STRING,
            (ID_CHARACTER_BASE as usize) + index,
            windows::core::PCWSTR(wide.as_ptr()),
        );
    }

    let _ = AppendMenuW(hmenu, MF_SEPARATOR, 0, windows::core::PCWSTR::null());

    let quit_label: Vec<u16> = "Quit\0".encode_utf16().collect();
    let _ = AppendMenuW(
        hmenu,
        MF_STRING,
        ID_QUIT as usize,
        windows::core::PCWSTR(quit_label.as_ptr()),
    );

    let mut pt = windows::Win32::Foundation::POINT::default();
    let _ = GetCursorPos(&mut pt);

    // Required so the menu closes when clicking outside
    let _ = SetForegroundWindow(hwnd);

    let _ = TrackPopupMenu(
        hmenu,
        TPM_LEFTALIGN | TPM_BOTTOMALIGN,
        pt.x,
        pt.y,
        0,
        hwnd,
        None,
    );

    let _ = DestroyMenu(hmenu);
}

// Non-windows stub
#[cfg(not(windows))]
impl PetMenu {
    pub fn new(_names: Vec<String>) -> Self {
        Self {}
    }
    pub fn show(&mut self) {}
    pub fn poll(&mut self) -> Option<MenuCommand> {
        None
    }
}
