//! Note event bus
//!
//! Typed publish/subscribe channel between whatever plays notes (the
//! on-screen keyboard, shortcuts, tests) and whatever reacts to them (the
//! piano roll, a synth). The app owns the bus and hands clones to each
//! side; there is no global instance.
//!
//! Each subscriber gets its own unbounded channel, so delivery order per
//! subscriber is publish order. Dropping a [`Subscription`] detaches it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// A key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteEvent {
    On(u8),
    Off(u8),
}

impl NoteEvent {
    pub fn note(&self) -> u8 {
        match *self {
            NoteEvent::On(n) | NoteEvent::Off(n) => n,
        }
    }
}

#[derive(Debug, Default)]
struct BusInner {
    subscribers: Mutex<Vec<(u64, Sender<NoteEvent>)>>,
    next_id: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct NoteBus {
    inner: Arc<BusInner>,
}

impl NoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. It sees every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner.subscribers.lock().push((id, tx));
        log::debug!("note bus: subscriber {} attached", id);
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every subscriber. Returns how many received it.
    pub fn publish(&self, event: NoteEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|(id, tx)| {
            let alive = tx.send(event).is_ok();
            if !alive {
                log::debug!("note bus: subscriber {} went away", id);
            }
            alive
        });
        log::trace!("note bus: {:?} -> {} subscriber(s)", event, subscribers.len());
        subscribers.len()
    }

    pub fn note_on(&self, note: u8) -> usize {
        self.publish(NoteEvent::On(note))
    }

    pub fn note_off(&self, note: u8) -> usize {
        self.publish(NoteEvent::Off(note))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Receiving end of a bus subscription.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: Receiver<NoteEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn try_recv(&self) -> Option<NoteEvent> {
        self.rx.try_recv().ok()
    }

    /// Everything delivered so far, oldest first. Never blocks.
    pub fn drain(&self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.rx.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Detach from the bus. Same as dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.lock().retain(|(id, _)| *id != self.id);
            log::debug!("note bus: subscriber {} detached", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_in_publish_order() {
        let bus = NoteBus::new();
        let sub = bus.subscribe();
        bus.note_on(60);
        bus.note_on(64);
        bus.note_off(60);
        let events: Vec<_> = sub.drain().collect();
        assert_eq!(
            events,
            vec![NoteEvent::On(60), NoteEvent::On(64), NoteEvent::Off(60)]
        );
        assert_eq!(sub.pending(), 0);
    }

    #[test]
    fn test_fans_out_to_every_subscriber() {
        let bus = NoteBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_eq!(bus.note_on(50), 2);
        assert_eq!(a.try_recv(), Some(NoteEvent::On(50)));
        assert_eq!(b.try_recv(), Some(NoteEvent::On(50)));
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = NoteBus::new();
        bus.note_on(50);
        let sub = bus.subscribe();
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_drop_detaches() {
        let bus = NoteBus::new();
        let sub = bus.subscribe();
        let keep = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.note_off(50), 1);
        drop(keep);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.note_on(50), 0);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = NoteBus::new();
        let sub = bus.subscribe();
        bus.note_on(61);
        drop(bus);
        assert_eq!(sub.try_recv(), Some(NoteEvent::On(61)));
        drop(sub);
    }

    #[test]
    fn test_order_preserved_across_threads() {
        let bus = NoteBus::new();
        let sub = bus.subscribe();
        let publisher = bus.clone();
        std::thread::spawn(move || {
            for note in 0..100u8 {
                publisher.note_on(note);
                publisher.note_off(note);
            }
        })
        .join()
        .unwrap();

        let events: Vec<_> = sub.drain().collect();
        assert_eq!(events.len(), 200);
        for (i, pair) in events.chunks(2).enumerate() {
            assert_eq!(pair, [NoteEvent::On(i as u8), NoteEvent::Off(i as u8)]);
        }
    }

    #[test]
    fn test_event_note() {
        assert_eq!(NoteEvent::On(3).note(), 3);
        assert_eq!(NoteEvent::Off(9).note(), 9);
    }
}
