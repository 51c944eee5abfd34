use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::api::{ListenerId, TimelineEvent, TimelineListener};

/// Registry of weakly held timeline listeners.
#[derive(Default)]
pub struct ListenerSet {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Weak<dyn TimelineListener>)>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Weak<dyn TimelineListener>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        debug!(listener_id = id.0, "timeline listener added");
        id
    }

    pub fn remove(&self, id: ListenerId) {
        self.entries.borrow_mut().retain(|(entry_id, _)| *entry_id != id);
        debug!(listener_id = id.0, "timeline listener removed");
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Delivers `events` in order to every registered listener.
    ///
    /// No borrow is held while a listener runs, so listeners may register,
    /// unregister or issue engine commands from inside a callback. A listener
    /// removed mid-round receives nothing further.
    pub fn notify(&self, events: &[TimelineEvent]) {
        for event in events {
            for (id, listener) in self.live_listeners() {
                if !self.contains(id) {
                    continue;
                }
                event.dispatch(listener.as_ref());
            }
        }
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(entry_id, _)| *entry_id == id)
    }

    fn live_listeners(&self) -> Vec<(ListenerId, Rc<dyn TimelineListener>)> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|(_, listener)| listener.strong_count() > 0);
        entries
            .iter()
            .filter_map(|(id, listener)| listener.upgrade().map(|listener| (*id, listener)))
            .collect()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("next_id", &self.next_id.get())
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    use super::ListenerSet;
    use crate::api::{ListenerId, TimelineEvent, TimelineListener};

    #[derive(Default)]
    struct Recorder {
        seeks: RefCell<Vec<f64>>,
    }

    impl TimelineListener for Recorder {
        fn on_progress_changed(&self, seek: f64) {
            self.seeks.borrow_mut().push(seek);
        }
    }

    struct SelfRemoving {
        set: Rc<ListenerSet>,
        id: Cell<Option<ListenerId>>,
        calls: Cell<usize>,
    }

    impl TimelineListener for SelfRemoving {
        fn on_progress_changed(&self, _seek: f64) {
            self.calls.set(self.calls.get() + 1);
            if let Some(id) = self.id.take() {
                self.set.remove(id);
            }
        }
    }

    fn progress(seek: f64) -> TimelineEvent {
        TimelineEvent::ProgressChanged { seek }
    }

    #[test]
    fn notify_delivers_events_in_order() {
        let set = ListenerSet::new();
        let recorder = Rc::new(Recorder::default());
        let weak = Rc::downgrade(&recorder) as Weak<dyn TimelineListener>;
        set.add(weak);

        set.notify(&[progress(1.0), progress(2.0)]);

        assert_eq!(*recorder.seeks.borrow(), vec![1.0, 2.0]);
    }

    #[test]
    fn removed_listener_receives_nothing() {
        let set = ListenerSet::new();
        let recorder = Rc::new(Recorder::default());
        let id = set.add(Rc::downgrade(&recorder) as Weak<dyn TimelineListener>);

        set.remove(id);
        set.notify(&[progress(1.0)]);

        assert!(recorder.seeks.borrow().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn dropped_listener_is_pruned() {
        let set = ListenerSet::new();
        let recorder = Rc::new(Recorder::default());
        set.add(Rc::downgrade(&recorder) as Weak<dyn TimelineListener>);
        drop(recorder);

        set.notify(&[progress(1.0)]);

        assert_eq!(set.len(), 0);
    }

    #[test]
    fn removal_inside_callback_stops_the_current_round() {
        let set = Rc::new(ListenerSet::new());
        let listener = Rc::new(SelfRemoving {
            set: Rc::clone(&set),
            id: Cell::new(None),
            calls: Cell::new(0),
        });
        let id = set.add(Rc::downgrade(&listener) as Weak<dyn TimelineListener>);
        listener.id.set(Some(id));

        set.notify(&[progress(1.0), progress(2.0), progress(3.0)]);

        assert_eq!(listener.calls.get(), 1);
    }
}
