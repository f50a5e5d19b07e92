//! Tests for the in-memory event list

use episim_kernel::core::{EventList, KernelError};
use episim_kernel::infra::event_list::InMemoryEventList;
use episim_kernel::util::Instant;

#[test]
fn test_capacity_is_enforced() {
    let mut list = InMemoryEventList::new(2);
    list.schedule(Instant::of(1.0)).unwrap();
    list.schedule(Instant::of(2.0)).unwrap();
    assert!(matches!(
        list.schedule(Instant::of(3.0)),
        Err(KernelError::EventListFull(_))
    ));

    assert_eq!(list.pop_next(), Some(Instant::of(1.0)));
    assert!(list.schedule(Instant::of(3.0)).is_ok());
    assert_eq!(list.len(), 2);
}

#[test]
fn test_clear() {
    let mut list = InMemoryEventList::new(8);
    list.schedule(Instant::of(4.0)).unwrap();
    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.peek(), None);
    assert_eq!(list.max_depth(), 8);
}

#[test]
fn test_usable_as_trait_object() {
    let mut list: Box<dyn EventList> = Box::new(InMemoryEventList::new(4));
    list.schedule(Instant::of(-1.0)).unwrap();
    list.schedule(Instant::of(-2.0)).unwrap();
    assert_eq!(list.pop_next(), Some(Instant::of(-2.0)));
}

#[test]
fn test_withdrawn_events_are_skipped_and_compacted() {
    let mut list: Box<dyn EventList> = Box::new(InMemoryEventList::new(4));
    for t in [1.0, 2.0, 3.0, 4.0] {
        list.schedule(Instant::of(t)).unwrap();
    }
    for t in [2.0, 3.0, 4.0] {
        list.remove(Instant::of(t));
    }
    assert_eq!(list.len(), 1);
    assert_eq!(list.peek(), Some(Instant::of(1.0)));

    for t in [5.0, 6.0, 7.0] {
        list.schedule(Instant::of(t)).unwrap();
    }
    let order: Vec<_> = std::iter::from_fn(|| list.pop_next()).collect();
    assert_eq!(order, [1.0, 5.0, 6.0, 7.0].map(Instant::of).to_vec());
}
