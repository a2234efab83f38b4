//! crates/todo_core/src/todo_store.rs
//!
//! In-memory cache of the signed-in user's todo items. It never talks to the
//! network and never generates ids; it only applies results the server returned.

use crate::domain::TodoItem;

#[derive(Debug, Default, Clone)]
pub struct TodoStore {
    items: Vec<TodoItem>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole cache with the result of a list fetch.
    pub fn replace_all(&mut self, items: Vec<TodoItem>) {
        self.items.clear();
        for item in items {
            self.add(item);
        }
    }

    /// Appends a newly created item. An item whose id is already cached
    /// replaces the cached entry in place.
    pub fn add(&mut self, item: TodoItem) {
        match self.position(item.id) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    /// Overwrites the cached item with the same id. Returns `false` if absent.
    pub fn update(&mut self, item: TodoItem) -> bool {
        match self.position(item.id) {
            Some(index) => {
                self.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// Removes the item with `id`. Returns `false` if absent.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}
