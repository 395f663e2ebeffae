//! Message-box confirmation prompt.

#![cfg(target_os = "windows")]

use std::ffi::CString;

use tracing::warn;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    IDCANCEL, IDYES, MB_ICONQUESTION, MB_YESNOCANCEL, MessageBoxA,
};
use windows::core::PCSTR;
use xrcap_core::gate::{Answer, ConfirmRequest, PROMPT_CAPTION, Prompt};

/// Asks with a Yes/No/Cancel message box owned by no window.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageBoxPrompt;

impl Prompt for MessageBoxPrompt {
    fn ask(&self, request: &ConfirmRequest) -> Answer {
        let (Ok(text), Ok(caption)) = (CString::new(request.message()), CString::new(PROMPT_CAPTION))
        else {
            warn!("confirmation text contains a NUL byte; declining");
            return Answer::No;
        };

        let reply = unsafe {
            MessageBoxA(
                HWND::default(),
                PCSTR(text.as_ptr().cast()),
                PCSTR(caption.as_ptr().cast()),
                MB_YESNOCANCEL | MB_ICONQUESTION,
            )
        };

        match reply {
            IDYES => Answer::Yes,
            IDCANCEL => Answer::Cancel,
            _ => Answer::No,
        }
    }
}
