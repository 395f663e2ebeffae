//! Session registry: which device each live session renders with, and how
//! many frames it has begun.

use std::collections::HashMap;

use crate::binding::DevicePointer;
use crate::xr::Session;

/// Per-session state recorded at `xrCreateSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRecord {
    /// Device the session renders with; null when the binding was not recognised.
    pub device: DevicePointer,
    /// Number of `xrBeginFrame` calls seen for this session.
    pub frame: u64,
}

impl SessionRecord {
    pub fn new(device: DevicePointer) -> Self {
        Self { device, frame: 0 }
    }

    /// Whether captures can ever be bound to this session.
    pub fn has_device(&self) -> bool {
        !self.device.is_null()
    }
}

/// Maps live session handles to their [`SessionRecord`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<Session, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly created session with its frame counter at zero.
    ///
    /// A handle the runtime hands out again after destruction starts over.
    pub fn register(&mut self, session: Session, device: DevicePointer) {
        self.sessions.insert(session, SessionRecord::new(device));
    }

    /// Forget a session. Returns the record if it was tracked.
    pub fn remove(&mut self, session: Session) -> Option<SessionRecord> {
        self.sessions.remove(&session)
    }

    pub fn get(&self, session: Session) -> Option<&SessionRecord> {
        self.sessions.get(&session)
    }

    /// Bump the frame counter by one. Returns the new value, or `None` if
    /// the session is not tracked.
    pub fn advance_frame(&mut self, session: Session) -> Option<u64> {
        let record = self.sessions.get_mut(&session)?;
        record.frame += 1;
        Some(record.frame)
    }

    /// Move every record out of `other`, frame counts included. A handle
    /// tracked by both keeps this registry's record. Returns how many
    /// records `other` held.
    pub fn absorb(&mut self, other: &mut SessionRegistry) -> usize {
        let moved = other.sessions.len();
        for (session, record) in other.sessions.drain() {
            self.sessions.entry(session).or_insert(record);
        }
        moved
    }

    pub fn contains(&self, session: Session) -> bool {
        self.sessions.contains_key(&session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(addr: usize) -> DevicePointer {
        DevicePointer::from_ptr(addr as *const std::ffi::c_void)
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(Session::from_raw(1)).is_none());
    }

    #[test]
    fn register_starts_at_frame_zero() {
        let mut registry = SessionRegistry::new();
        registry.register(Session::from_raw(7), device(0x10));
        let record = registry.get(Session::from_raw(7)).unwrap();
        assert_eq!(record.frame, 0);
        assert_eq!(record.device, device(0x10));
        assert!(record.has_device());
    }

    #[test]
    fn advance_frame_counts_calls() {
        let mut registry = SessionRegistry::new();
        registry.register(Session::from_raw(7), DevicePointer::NULL);
        assert_eq!(registry.advance_frame(Session::from_raw(7)), Some(1));
        assert_eq!(registry.advance_frame(Session::from_raw(7)), Some(2));
        assert_eq!(registry.advance_frame(Session::from_raw(8)), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.register(Session::from_raw(7), device(0x10));
        assert!(registry.remove(Session::from_raw(7)).is_some());
        assert!(registry.remove(Session::from_raw(7)).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn reused_handle_starts_over() {
        let mut registry = SessionRegistry::new();
        registry.register(Session::from_raw(7), device(0x10));
        registry.advance_frame(Session::from_raw(7));
        registry.remove(Session::from_raw(7));
        registry.register(Session::from_raw(7), device(0x20));
        let record = registry.get(Session::from_raw(7)).unwrap();
        assert_eq!(record.frame, 0);
        assert_eq!(record.device, device(0x20));
    }

    #[test]
    fn absorb_carries_frame_counts() {
        let mut old = SessionRegistry::new();
        old.register(Session::from_raw(7), device(0x10));
        old.advance_frame(Session::from_raw(7));
        old.register(Session::from_raw(8), device(0x30));

        let mut new = SessionRegistry::new();
        new.register(Session::from_raw(8), device(0x40));

        assert_eq!(new.absorb(&mut old), 2);
        assert!(old.is_empty());
        assert_eq!(new.get(Session::from_raw(7)).unwrap().frame, 1);
        assert_eq!(new.get(Session::from_raw(8)).unwrap().device, device(0x40));
    }
}
