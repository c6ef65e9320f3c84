//! Global keyboard hook based on rdev.
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot be
//! stopped, so one hook thread (`scopelock-rdev-hook`) is spawned on first
//! bind and shared. Sessions bind/unbind into a [`BindingSlot`]; the hook
//! callback only flips the bound session's flag.

use std::sync::{Arc, Mutex};

use crate::telemetry::hotkey::{ActiveFlag, BindingSlot, HotkeySource, HotkeySpec};

static HOOK: Mutex<Option<Arc<BindingSlot>>> = Mutex::new(None);

fn hook_slot() -> Result<Arc<BindingSlot>, String> {
    let mut guard = HOOK
        .lock()
        .map_err(|_| "hotkey hook registry poisoned".to_string())?;
    if let Some(slot) = guard.as_ref() {
        return Ok(slot.clone());
    }

    let slot = Arc::new(BindingSlot::new());
    let thread_slot = slot.clone();
    std::thread::Builder::new()
        .name("scopelock-rdev-hook".to_string())
        .spawn(move || {
            if let Err(e) = rdev::listen(move |event| handle_rdev_event(&thread_slot, event)) {
                log::error!("rdev::listen error: {e:?}");
            }
        })
        .map_err(|e| format!("Failed to spawn rdev thread: {e}"))?;

    *guard = Some(slot.clone());
    Ok(slot)
}

fn key_name(key: rdev::Key) -> String {
    format!("{key:?}").to_ascii_lowercase()
}

fn handle_rdev_event(slot: &BindingSlot, event: rdev::Event) {
    match event.event_type {
        rdev::EventType::KeyPress(key) => {
            slot.press(&key_name(key));
        }
        rdev::EventType::KeyRelease(key) => slot.release(&key_name(key)),
        _ => {}
    }
}

/// [`HotkeySource`] backed by the process-wide rdev hook.
#[derive(Debug, Default)]
pub struct GlobalHotkeyHook {
    token: Option<u64>,
}

impl GlobalHotkeyHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeySource for GlobalHotkeyHook {
    fn bind(&mut self, spec: &HotkeySpec, flag: ActiveFlag) -> Result<(), String> {
        let slot = hook_slot()?;
        self.token = Some(slot.bind(spec, flag)?);
        log::info!("GlobalHotkeyHook: bound '{spec}'");
        Ok(())
    }

    fn unbind(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let Ok(slot) = hook_slot() else {
            return;
        };
        if slot.unbind(token) {
            log::info!("GlobalHotkeyHook: unbound");
        } else {
            log::info!("GlobalHotkeyHook: binding already replaced, left in place");
        }
    }
}

impl Drop for GlobalHotkeyHook {
    fn drop(&mut self) {
        self.unbind();
    }
}
