//! Scatter data proxy: the owner of a resolved data array.
//!
//! The proxy is the only writer of its array. Consumers read it through
//! [`ScatterDataProxy::array`] (valid until the next mutation) or keep a
//! [`ScatterDataProxy::snapshot`], which later mutations never touch.
//! Every mutation publishes a [`ProxyEvent`] describing the affected range.

use std::sync::Arc;

use glam::Vec3;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::geometry;
use crate::item::{DataArray, DataItem};
use crate::source::DEFAULT_EVENT_CAPACITY;

/// Change notification published after each proxy mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyEvent {
    /// The whole array was replaced.
    Reset,
    /// Items were appended.
    Added {
        /// Index of the first new item.
        start: usize,
        /// Number of new items.
        count: usize,
    },
    /// Items were replaced in place.
    Changed {
        /// Index of the first replaced item.
        start: usize,
        /// Number of replaced items.
        count: usize,
    },
    /// Items were removed.
    Removed {
        /// Index of the first removed item.
        start: usize,
        /// Number of removed items.
        count: usize,
    },
    /// Items were inserted.
    Inserted {
        /// Index of the first inserted item.
        start: usize,
        /// Number of inserted items.
        count: usize,
    },
}

/// Owner of a scatter data array and its mutation API.
#[derive(Debug)]
pub struct ScatterDataProxy {
    array: Arc<DataArray>,
    events: broadcast::Sender<ProxyEvent>,
}

impl Default for ScatterDataProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScatterDataProxy {
    /// Create a proxy with an empty array.
    #[must_use]
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a proxy that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            array: Arc::new(DataArray::new()),
            events,
        }
    }

    /// Receive future change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProxyEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: ProxyEvent) {
        trace!(?event, "proxy event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Mutable access, copying the array first if a snapshot still shares it.
    fn array_mut(&mut self) -> &mut DataArray {
        Arc::make_mut(&mut self.array)
    }

    /// `index..index + count` must lie within the array.
    fn check_range(&self, index: usize, count: usize) -> Result<()> {
        let len = self.array.len();
        match index.checked_add(count) {
            Some(end) if end <= len => Ok(()),
            _ => Err(Error::out_of_range(index, count, len)),
        }
    }

    /// `index` must be a valid insertion or removal point. `count` is only
    /// reported in the error.
    fn check_index(&self, index: usize, count: usize) -> Result<()> {
        let len = self.array.len();
        if index > len {
            return Err(Error::out_of_range(index, count, len));
        }
        Ok(())
    }

    /// Replace the whole array.
    ///
    /// Replacing an empty array with another empty array is a no-op and
    /// publishes nothing.
    pub fn reset_array(&mut self, array: DataArray) {
        if self.array.is_empty() && array.is_empty() {
            return;
        }
        debug!(items = array.len(), "array reset");
        self.array = Arc::new(array);
        self.publish(ProxyEvent::Reset);
    }

    /// Replace the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= item_count()`.
    pub fn set_item(&mut self, index: usize, item: DataItem) -> Result<()> {
        self.check_range(index, 1)?;
        self.array_mut()[index] = item;
        self.publish(ProxyEvent::Changed {
            start: index,
            count: 1,
        });
        Ok(())
    }

    /// Replace `items.len()` items starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the range extends past the end;
    /// the array is left untouched.
    pub fn set_items(&mut self, index: usize, items: &[DataItem]) -> Result<()> {
        self.check_range(index, items.len())?;
        if items.is_empty() {
            return Ok(());
        }
        self.array_mut()[index..index + items.len()].copy_from_slice(items);
        self.publish(ProxyEvent::Changed {
            start: index,
            count: items.len(),
        });
        Ok(())
    }

    /// Append an item, returning its index.
    pub fn add_item(&mut self, item: DataItem) -> usize {
        let start = self.array.len();
        self.array_mut().push(item);
        self.publish(ProxyEvent::Added { start, count: 1 });
        start
    }

    /// Append items, returning the index of the first one.
    pub fn add_items(&mut self, items: &[DataItem]) -> usize {
        let start = self.array.len();
        if !items.is_empty() {
            self.array_mut().extend_from_slice(items);
            self.publish(ProxyEvent::Added {
                start,
                count: items.len(),
            });
        }
        start
    }

    /// Insert an item before `index`. Inserting at `item_count()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > item_count()`.
    pub fn insert_item(&mut self, index: usize, item: DataItem) -> Result<()> {
        self.check_index(index, 1)?;
        self.array_mut().insert(index, item);
        self.publish(ProxyEvent::Inserted {
            start: index,
            count: 1,
        });
        Ok(())
    }

    /// Insert items before `index`. Inserting at `item_count()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > item_count()`.
    pub fn insert_items(&mut self, index: usize, items: &[DataItem]) -> Result<()> {
        self.check_index(index, items.len())?;
        if items.is_empty() {
            return Ok(());
        }
        self.array_mut().splice(index..index, items.iter().copied());
        self.publish(ProxyEvent::Inserted {
            start: index,
            count: items.len(),
        });
        Ok(())
    }

    /// Remove up to `count` items starting at `index`, returning how many
    /// were removed. Counts past the end are clamped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > item_count()`.
    pub fn remove_items(&mut self, index: usize, count: usize) -> Result<usize> {
        self.check_index(index, count)?;
        let count = count.min(self.array.len() - index);
        if count == 0 {
            return Ok(0);
        }
        self.array_mut().drain(index..index + count);
        self.publish(ProxyEvent::Removed {
            start: index,
            count,
        });
        Ok(count)
    }

    /// Number of items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.array.len()
    }

    /// Read-only view of the array.
    #[must_use]
    pub fn array(&self) -> &[DataItem] {
        &self.array
    }

    /// Item at `index`, if in range.
    #[must_use]
    pub fn item_at(&self, index: usize) -> Option<&DataItem> {
        self.array.get(index)
    }

    /// Shared handle to the current array. Later mutations copy instead of
    /// writing through the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DataArray> {
        Arc::clone(&self.array)
    }

    /// Per-axis maximum absolute coordinate.
    #[must_use]
    pub fn limit_values(&self) -> Vec3 {
        geometry::limit_values(&self.array)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_items(max: usize) -> impl Strategy<Value = DataArray> {
        prop::collection::vec((-1e3f32..1e3, -1e3f32..1e3, -1e3f32..1e3), 0..max)
            .prop_map(|v| v.into_iter().map(DataItem::from).collect())
    }

    proptest! {
        /// Inserting then removing the same range restores the array.
        #[test]
        fn prop_insert_remove_inverse(
            base in arb_items(50),
            extra in arb_items(20),
            at in 0usize..=50,
        ) {
            let mut proxy = ScatterDataProxy::new();
            proxy.reset_array(base.clone());
            let index = at.min(base.len());

            proxy.insert_items(index, &extra).unwrap();
            let removed = proxy.remove_items(index, extra.len()).unwrap();

            prop_assert_eq!(removed, extra.len());
            prop_assert_eq!(proxy.array(), base.as_slice());
        }

        /// Over-long removals remove exactly what remains after `index`.
        #[test]
        fn prop_remove_clamps_to_tail(
            base in arb_items(50),
            at in 0usize..=50,
            count in 0usize..200,
        ) {
            let mut proxy = ScatterDataProxy::new();
            proxy.reset_array(base.clone());
            let index = at.min(base.len());

            let removed = proxy.remove_items(index, count).unwrap();

            prop_assert_eq!(removed, count.min(base.len() - index));
            prop_assert_eq!(proxy.item_count(), base.len() - removed);
        }

        /// Reset is the identity on the array it is given.
        #[test]
        fn prop_reset_identity(array in arb_items(100)) {
            let mut proxy = ScatterDataProxy::new();
            proxy.reset_array(array.clone());
            prop_assert_eq!(proxy.array(), array.as_slice());
        }
    }
}
