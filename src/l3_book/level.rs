use super::types::{OrderId, RestingOrder};
use rust_decimal::Decimal;
use slab::Slab;
use std::collections::HashMap;

struct Node {
    order: RestingOrder,
    next: Option<usize>,
    prev: Option<usize>,
}

/// One price, one side: a FIFO (time-priority) sequence of resting orders.
///
/// Backed by a slab-allocated doubly linked list with an id index, so head
/// access and cancellation of an arbitrary order are both O(1). A level is
/// kept in its side's map only while it holds at least one order.
pub struct PriceLevel {
    ids: HashMap<OrderId, usize>,
    backing: Slab<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    total: Decimal,
}

impl PriceLevel {
    pub fn new() -> PriceLevel {
        PriceLevel {
            ids: HashMap::new(),
            backing: Slab::new(),
            head: None,
            tail: None,
            total: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backing.len()
    }

    /// Sum of remaining sizes across the level.
    pub fn total_size(&self) -> Decimal {
        self.total
    }

    pub fn front(&self) -> Option<&RestingOrder> {
        let id = self.head?;
        Some(&self.backing.get(id)?.order)
    }

    /// Appends at the back of the queue. Rejects a duplicate id.
    pub fn push_back(&mut self, order: RestingOrder) -> bool {
        if self.ids.contains_key(&order.id) {
            return false;
        }

        self.total += order.size;
        let key = order.id.clone();
        let id = self.backing.insert(Node {
            order,
            next: None,
            prev: self.tail,
        });
        self.ids.insert(key, id);

        match self.tail {
            Some(pid) => {
                self.backing[pid].next = Some(id);
                self.tail = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        };

        true
    }

    pub fn pop_front(&mut self) -> Option<RestingOrder> {
        let id = self.head?;
        let node = self.backing.try_remove(id)?;
        self.ids.remove(&node.order.id);
        self.total -= node.order.size;

        match node.next {
            Some(nid) => {
                self.backing[nid].prev = None;
                self.head = Some(nid);
            }
            None => {
                self.head = None;
                self.tail = None;
            }
        };

        Some(node.order)
    }

    /// Unlinks the order with this id, wherever it sits in the queue.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let id = self.ids.remove(order_id)?;
        let node = self.backing.remove(id);
        self.total -= node.order.size;

        match node.next {
            Some(nid) => self.backing[nid].prev = node.prev,
            None => self.tail = node.prev,
        }
        match node.prev {
            Some(pid) => self.backing[pid].next = node.next,
            None => self.head = node.next,
        }

        Some(node.order)
    }

    /// Decrements the head order's size. The caller has already checked the
    /// head id and that `by` does not exhaust it.
    pub fn reduce_front(&mut self, by: Decimal) {
        if let Some(id) = self.head {
            self.backing[id].order.size -= by;
            self.total -= by;
        }
    }

    /// Overwrites the size of the order with this id. Returns false if the
    /// id is not at this level.
    pub fn set_size(&mut self, order_id: &OrderId, new_size: Decimal) -> bool {
        let Some(&id) = self.ids.get(order_id) else {
            return false;
        };
        let order = &mut self.backing[id].order;
        self.total += new_size - order.size;
        order.size = new_size;
        true
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.ids.contains_key(order_id)
    }

    /// Orders in time priority, head first.
    pub fn iter(&self) -> LevelIter<'_> {
        LevelIter {
            level: self,
            current: self.head,
        }
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LevelIter<'a> {
    level: &'a PriceLevel,
    current: Option<usize>,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = &'a RestingOrder;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = &self.level.backing[id];
        self.current = node.next;
        Some(&node.order)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(id: &str, size: &str) -> RestingOrder {
        RestingOrder {
            id: id.into(),
            price: d("100.00"),
            size: d(size),
        }
    }

    #[test]
    fn fifo_order() {
        let mut level = PriceLevel::new();

        assert!(level.push_back(order("a", "1")));
        assert!(level.push_back(order("b", "2")));
        assert!(level.push_back(order("c", "3")));

        // Duplicate id rejected
        assert!(!level.push_back(order("b", "9")));

        let ids: Vec<&str> = level.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(level.total_size(), d("6"));

        assert_eq!(level.pop_front().unwrap().id, OrderId::from("a"));
        assert_eq!(level.front().unwrap().id, OrderId::from("b"));
        assert_eq!(level.total_size(), d("5"));
    }

    #[test]
    fn remove_middle_and_tail() {
        let mut level = PriceLevel::new();
        for id in ["a", "b", "c", "d"] {
            level.push_back(order(id, "1"));
        }

        assert!(level.remove(&"b".into()).is_some());
        assert!(level.remove(&"d".into()).is_some());
        assert!(level.remove(&"x".into()).is_none());

        let ids: Vec<&str> = level.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(level.total_size(), d("2"));

        // Tail pointer survives tail removal
        assert!(level.push_back(order("e", "1")));
        let ids: Vec<&str> = level.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "e"]);
    }

    #[test]
    fn remove_last_empties_level() {
        let mut level = PriceLevel::new();
        level.push_back(order("a", "1"));
        level.remove(&"a".into());

        assert!(level.is_empty());
        assert_eq!(level.total_size(), Decimal::ZERO);
        assert!(level.front().is_none());

        // Reusable after going empty
        assert!(level.push_back(order("b", "2")));
        assert_eq!(level.front().unwrap().id, OrderId::from("b"));
    }

    #[test]
    fn reduce_and_set_size_track_total() {
        let mut level = PriceLevel::new();
        level.push_back(order("a", "5"));
        level.push_back(order("b", "3"));

        level.reduce_front(d("2"));
        assert_eq!(level.front().unwrap().size, d("3"));
        assert_eq!(level.total_size(), d("6"));

        assert!(level.set_size(&"b".into(), d("1")));
        assert!(!level.set_size(&"x".into(), d("1")));
        assert_eq!(level.total_size(), d("4"));
    }
}
