use serde::Serialize;

use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubscriptionID(usize);

/// A value that other parts of the application can watch. Subscribers hear about every change,
/// but not about publishing the same value again.
pub struct Observable<T> {
    value: T,
    next_id: usize,
    subscribers: Vec<(SubscriptionID, Box<dyn FnMut(&T)>)>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn subscribe<F: FnMut(&T) + 'static>(&mut self, cb: F) -> SubscriptionID {
        let id = SubscriptionID(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(cb)));
        id
    }

    /// Returns false if the subscription didn't exist
    pub fn unsubscribe(&mut self, id: SubscriptionID) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(x, _)| *x != id);
        self.subscribers.len() != before
    }

    /// Returns true if the value changed and subscribers were notified.
    pub fn publish(&mut self, value: T) -> bool {
        if value == self.value {
            return false;
        }
        self.value = value;
        for (_, cb) in &mut self.subscribers {
            cb(&self.value);
        }
        true
    }
}

/// Everything the replay publishes to the rest of the application. Owned by one session and
/// handed in from outside, so nothing here is global.
pub struct SessionState {
    /// The sample a synchronized table should highlight
    pub current_row: Observable<Option<usize>>,
    pub viewport: Observable<Viewport>,
}

impl SessionState {
    pub fn new(initial_viewport: Viewport) -> Self {
        Self {
            current_row: Observable::new(None),
            viewport: Observable::new(initial_viewport),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn only_changes_are_published() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut row = Observable::new(None);
        let id = {
            let seen = seen.clone();
            row.subscribe(move |x: &Option<usize>| seen.borrow_mut().push(*x))
        };

        assert!(row.publish(Some(1)));
        assert!(!row.publish(Some(1)));
        assert!(row.publish(Some(2)));
        assert_eq!(*seen.borrow(), vec![Some(1), Some(2)]);
        assert_eq!(*row.get(), Some(2));

        assert!(row.unsubscribe(id));
        assert!(!row.unsubscribe(id));
        row.publish(None);
        assert_eq!(seen.borrow().len(), 2);
    }
}
