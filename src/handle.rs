//! Integer handles for passing options across a host boundary.
//!
//! A host that cannot hold Rust values keeps an [`OptionsHandle`] instead
//! and hands it back to the [`OptionsRegistry`] which owns the options.
//! Handles carry a generation number, so a handle which has been
//! destroyed, or which refers to a slot since reused, is recognised as
//! stale and ignored rather than aliasing another caller's options.

use crate::backend::TlsBackend;
use crate::error::Result;
use crate::options::{TlsContextOptions, TlsContextOptionsInputs};

/// Opaque reference to options held by an [`OptionsRegistry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionsHandle(u64);

impl OptionsHandle {
    /// The handle which refers to nothing.
    pub const NULL: Self = Self(0);

    fn new(index: usize, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | (index as u64 + 1))
    }

    /// The handle as an integer for the host.
    pub fn into_raw(self) -> u64 {
        self.0
    }

    /// A handle from an integer the host got from [`OptionsHandle::into_raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Whether this is [`OptionsHandle::NULL`].
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    fn slot(self) -> Option<(usize, u32)> {
        let index = (self.0 & 0xffff_ffff).checked_sub(1)?;
        Some((index as usize, (self.0 >> 32) as u32))
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Owner of all options created through handles.
pub struct OptionsRegistry<B: TlsBackend> {
    slots: Vec<Slot<TlsContextOptions<B>>>,
    free: Vec<usize>,
}

impl<B: TlsBackend> Default for OptionsRegistry<B> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<B: TlsBackend> OptionsRegistry<B> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options and register them. Nothing is registered if the
    /// build fails.
    pub fn create(
        &mut self,
        backend: &B,
        inputs: &TlsContextOptionsInputs<'_>,
    ) -> Result<OptionsHandle> {
        let options = TlsContextOptions::build(backend, inputs)?;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.value = Some(options);
        Ok(OptionsHandle::new(index, slot.generation))
    }

    /// The options behind `handle`, unless it is null or stale.
    pub fn get(&self, handle: OptionsHandle) -> Option<&TlsContextOptions<B>> {
        let (index, generation) = handle.slot()?;
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Release the options behind `handle`. Null and stale handles are
    /// ignored.
    pub fn destroy(&mut self, handle: OptionsHandle) {
        let Some((index, generation)) = handle.slot() else {
            return;
        };
        match self.slots.get_mut(index) {
            Some(slot) if slot.generation == generation && slot.value.is_some() => {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
            _ => log::debug!("Ignoring destroy of stale options handle {:#x}", handle.0),
        }
    }

    /// Number of live options.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether no options are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Call, RecordingBackend};

    #[test]
    fn null_handle() {
        let mut registry = OptionsRegistry::<RecordingBackend>::new();
        assert!(OptionsHandle::NULL.is_null());
        assert_eq!(OptionsHandle::from_raw(0), OptionsHandle::NULL);
        assert!(registry.get(OptionsHandle::NULL).is_none());
        registry.destroy(OptionsHandle::NULL);
        assert!(registry.is_empty());
    }

    #[test]
    fn destroy_releases_exactly_once() {
        let backend = RecordingBackend::default();
        let mut registry = OptionsRegistry::new();
        let handle = registry
            .create(&backend, &TlsContextOptionsInputs::default())
            .expect("create");
        assert!(!handle.is_null());
        assert!(registry.get(handle).is_some());
        assert_eq!(backend.live_options(), 1);

        let raw = handle.into_raw();
        registry.destroy(OptionsHandle::from_raw(raw));
        assert_eq!(backend.live_options(), 0);
        assert!(registry.get(handle).is_none());
        registry.destroy(handle);
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let backend = RecordingBackend::default();
        let mut registry = OptionsRegistry::new();
        let first = registry
            .create(&backend, &TlsContextOptionsInputs::default())
            .expect("create");
        registry.destroy(first);
        let second = registry
            .create(
                &backend,
                &TlsContextOptionsInputs {
                    verify_peer: false,
                    ..Default::default()
                },
            )
            .expect("create");
        assert_ne!(first, second);
        assert!(registry.get(first).is_none());
        registry.destroy(first);
        assert_eq!(registry.len(), 1);
        assert_eq!(backend.live_options(), 1);
        assert!(!registry.get(second).expect("live").verify_peer());
    }

    #[test]
    fn failed_create_registers_nothing() {
        let backend = RecordingBackend::rejecting(Call::AlpnList);
        let mut registry = OptionsRegistry::new();
        assert!(
            registry
                .create(
                    &backend,
                    &TlsContextOptionsInputs {
                        alpn: Some(b"h2"),
                        ..Default::default()
                    }
                )
                .is_err()
        );
        assert!(registry.is_empty());
        assert_eq!(backend.live_options(), 0);
    }
}
