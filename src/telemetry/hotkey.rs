//! Activation hotkey: parsing, key matching and the shared active flag.
//!
//! The listener side only ever flips [`ActiveFlag`]; that flag is the single
//! piece of state shared with the loop thread.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared on/off switch between the hotkey listener and the loop thread.
#[derive(Debug, Clone, Default)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Cmd,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "alt" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            "cmd" | "meta" | "win" => Some(Modifier::Cmd),
            _ => None,
        }
    }

    /// Key names (lowercased `rdev::Key` debug names) that satisfy this modifier.
    pub fn key_names(&self) -> &'static [&'static str] {
        match self {
            Modifier::Ctrl => &["controlleft", "controlright"],
            Modifier::Alt => &["alt", "altgr"],
            Modifier::Shift => &["shiftleft", "shiftright"],
            Modifier::Cmd => &["metaleft", "metaright"],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::Cmd => "cmd",
        }
    }
}

/// Parsed hotkey such as `CapsLock` or `ctrl+shift+f2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeySpec {
    pub modifiers: Vec<Modifier>,
    /// Canonical key name (lowercased `rdev::Key` debug name).
    pub key: String,
}

impl HotkeySpec {
    pub fn parse(text: &str) -> Result<Self, String> {
        let normalized: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if normalized.is_empty() {
            return Err("hotkey is empty".to_string());
        }

        let mut modifiers = Vec::new();
        let mut key = None;
        for part in normalized.split('+') {
            if part.is_empty() {
                return Err(format!("hotkey '{text}' has an empty part"));
            }
            if let Some(modifier) = Modifier::parse(part) {
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
                continue;
            }
            if key.is_some() {
                return Err(format!("hotkey '{text}' names more than one key"));
            }
            key = Some(canonical_key_name(part)?);
        }

        let key = key.ok_or_else(|| format!("hotkey '{text}' has no non-modifier key"))?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.label())?;
        }
        write!(f, "{}", self.key)
    }
}

fn canonical_key_name(token: &str) -> Result<String, String> {
    let alias = match token {
        "caps" | "capslock" => "capslock",
        "esc" | "escape" => "escape",
        "enter" | "return" => "return",
        "del" | "delete" => "delete",
        "ins" | "insert" => "insert",
        "space" => "space",
        "tab" => "tab",
        "backspace" => "backspace",
        "home" => "home",
        "end" => "end",
        "pageup" | "pgup" => "pageup",
        "pagedown" | "pgdn" => "pagedown",
        "up" => "uparrow",
        "down" => "downarrow",
        "left" => "leftarrow",
        "right" => "rightarrow",
        _ => "",
    };
    if !alias.is_empty() {
        return Ok(alias.to_string());
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => return Ok(format!("key{c}")),
        (Some(c), None) if c.is_ascii_digit() => return Ok(format!("num{c}")),
        _ => {}
    }

    if let Some(n) = token.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(format!("f{n}"));
        }
    }

    if token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(token.to_string());
    }
    Err(format!("unknown key '{token}'"))
}

/// Tracks held keys and reports when the hotkey fires.
#[derive(Debug, Clone)]
pub struct HotkeyMatcher {
    spec: HotkeySpec,
    held: HashSet<String>,
}

impl HotkeyMatcher {
    pub fn new(spec: HotkeySpec) -> Self {
        Self {
            spec,
            held: HashSet::new(),
        }
    }

    pub fn spec(&self) -> &HotkeySpec {
        &self.spec
    }

    /// Feeds a key press; true when the hotkey fires. Auto-repeat of a held key does not fire.
    pub fn press(&mut self, key_name: &str) -> bool {
        let key_name = key_name.to_ascii_lowercase();
        let fresh = self.held.insert(key_name.clone());
        fresh && key_name == self.spec.key && self.modifiers_held()
    }

    pub fn release(&mut self, key_name: &str) {
        self.held.remove(&key_name.to_ascii_lowercase());
    }

    fn modifiers_held(&self) -> bool {
        self.spec.modifiers.iter().all(|modifier| {
            modifier
                .key_names()
                .iter()
                .any(|name| self.held.contains(*name))
        })
    }
}

struct Binding {
    token: u64,
    matcher: HotkeyMatcher,
    flag: ActiveFlag,
}

/// The single hotkey binding fed by a global key hook.
///
/// Each `bind` returns a token; `unbind` only clears the slot while that token
/// still owns it, so a late cleanup from a replaced session leaves the newer
/// binding alone.
#[derive(Default)]
pub struct BindingSlot {
    binding: Mutex<Option<Binding>>,
    next_token: AtomicU64,
}

impl BindingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, spec: &HotkeySpec, flag: ActiveFlag) -> Result<u64, String> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self
            .binding
            .lock()
            .map_err(|_| "hotkey binding poisoned".to_string())?;
        if guard.is_some() {
            log::warn!("hotkey: replacing an existing binding");
        }
        *guard = Some(Binding {
            token,
            matcher: HotkeyMatcher::new(spec.clone()),
            flag,
        });
        Ok(token)
    }

    /// Clears the binding if `token` still owns it. Returns true when cleared.
    pub fn unbind(&self, token: u64) -> bool {
        let Ok(mut guard) = self.binding.lock() else {
            return false;
        };
        if guard.as_ref().map(|binding| binding.token) == Some(token) {
            guard.take();
            true
        } else {
            false
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Feeds a key press; toggles the bound flag when the hotkey fires.
    /// Returns the new active state if it fired.
    pub fn press(&self, key_name: &str) -> Option<bool> {
        let mut guard = self.binding.lock().ok()?;
        let binding = guard.as_mut()?;
        if !binding.matcher.press(key_name) {
            return None;
        }
        let active = binding.flag.toggle();
        log::info!("hotkey '{}': active={active}", binding.matcher.spec());
        Some(active)
    }

    pub fn release(&self, key_name: &str) {
        if let Ok(mut guard) = self.binding.lock() {
            if let Some(binding) = guard.as_mut() {
                binding.matcher.release(key_name);
            }
        }
    }
}

/// Delivers toggle events by flipping the bound flag.
pub trait HotkeySource: Send {
    fn bind(&mut self, spec: &HotkeySpec, flag: ActiveFlag) -> Result<(), String>;

    /// Stops delivering toggles. Called once during cleanup.
    fn unbind(&mut self);
}

/// No global hook; toggles arrive through `SessionHandle::toggle_active`.
#[derive(Debug, Default)]
pub struct DetachedHotkey;

impl HotkeySource for DetachedHotkey {
    fn bind(&mut self, spec: &HotkeySpec, _flag: ActiveFlag) -> Result<(), String> {
        log::debug!("hotkey '{spec}' not bound to a global hook");
        Ok(())
    }

    fn unbind(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_flag_toggles() {
        let flag = ActiveFlag::new(false);
        let shared = flag.clone();
        assert!(flag.toggle());
        assert!(shared.get());
        assert!(!shared.toggle());
        assert!(!flag.get());
    }

    #[test]
    fn parses_single_key_aliases() {
        assert_eq!(HotkeySpec::parse("CapsLock").unwrap().key, "capslock");
        assert_eq!(HotkeySpec::parse("caps").unwrap().key, "capslock");
        assert_eq!(HotkeySpec::parse("Esc").unwrap().key, "escape");
        assert_eq!(HotkeySpec::parse("enter").unwrap().key, "return");
        assert_eq!(HotkeySpec::parse("del").unwrap().key, "delete");
        assert_eq!(HotkeySpec::parse("F12").unwrap().key, "f12");
        assert_eq!(HotkeySpec::parse("x").unwrap().key, "keyx");
        assert_eq!(HotkeySpec::parse("5").unwrap().key, "num5");
    }

    #[test]
    fn parses_combinations() {
        let spec = HotkeySpec::parse("Ctrl + Shift + F2").unwrap();
        assert_eq!(spec.modifiers, vec![Modifier::Ctrl, Modifier::Shift]);
        assert_eq!(spec.key, "f2");
        assert_eq!(spec.to_string(), "ctrl+shift+f2");
    }

    #[test]
    fn rejects_malformed_hotkeys() {
        assert!(HotkeySpec::parse("").is_err());
        assert!(HotkeySpec::parse("ctrl+").is_err());
        assert!(HotkeySpec::parse("ctrl+alt").is_err());
        assert!(HotkeySpec::parse("a+b").is_err());
        assert!(HotkeySpec::parse("f1-").is_err());
    }

    #[test]
    fn matcher_fires_once_per_press() {
        let mut matcher = HotkeyMatcher::new(HotkeySpec::parse("CapsLock").unwrap());
        assert!(matcher.press("CapsLock"));
        assert!(!matcher.press("CapsLock"));
        matcher.release("CapsLock");
        assert!(matcher.press("CapsLock"));
        assert!(!matcher.press("KeyA"));
    }

    #[test]
    fn matcher_requires_modifiers() {
        let mut matcher = HotkeyMatcher::new(HotkeySpec::parse("ctrl+f1").unwrap());
        assert!(!matcher.press("F1"));
        matcher.release("F1");
        assert!(!matcher.press("ControlRight"));
        assert!(matcher.press("F1"));
        matcher.release("F1");
        matcher.release("ControlRight");
        assert!(!matcher.press("F1"));
    }

    #[test]
    fn binding_slot_toggles_bound_flag() {
        let slot = BindingSlot::new();
        let flag = ActiveFlag::new(false);
        slot.bind(&HotkeySpec::parse("CapsLock").unwrap(), flag.clone()).unwrap();

        assert_eq!(slot.press("CapsLock"), Some(true));
        assert!(flag.get());
        slot.release("CapsLock");
        assert_eq!(slot.press("KeyA"), None);
        assert_eq!(slot.press("CapsLock"), Some(false));
    }

    #[test]
    fn stale_unbind_keeps_newer_binding() {
        let slot = BindingSlot::new();
        let spec = HotkeySpec::parse("CapsLock").unwrap();
        let first = ActiveFlag::new(false);
        let second = ActiveFlag::new(false);

        let first_token = slot.bind(&spec, first.clone()).unwrap();
        let second_token = slot.bind(&spec, second.clone()).unwrap();
        assert_ne!(first_token, second_token);

        // The replaced session cleans up late.
        assert!(!slot.unbind(first_token));
        assert!(slot.is_bound());
        assert_eq!(slot.press("CapsLock"), Some(true));
        assert!(second.get());
        assert!(!first.get());

        assert!(slot.unbind(second_token));
        assert!(!slot.is_bound());
        assert!(!slot.unbind(second_token));
    }
}
