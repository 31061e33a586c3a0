//! Plain-data cell representation for servers, tools and tests.

use super::CellFactory;
use glam::Vec3;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessCell {
    pub id: u64,
    pub active: bool,
    pub position: Vec3,
}

#[derive(Debug, Default)]
pub struct HeadlessFactory {
    next_id: u64,
    destroyed: HashSet<u64>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instantiated(&self) -> u64 {
        self.next_id
    }

    /// Simulate the backing object disappearing outside the pool's control.
    pub fn destroy(&mut self, id: u64) {
        self.destroyed.insert(id);
    }
}

impl CellFactory for HeadlessFactory {
    type Handle = HeadlessCell;

    fn instantiate(&mut self) -> HeadlessCell {
        let id = self.next_id;
        self.next_id += 1;
        HeadlessCell {
            id,
            active: false,
            position: Vec3::ZERO,
        }
    }

    fn activate(&mut self, handle: &mut HeadlessCell) {
        handle.active = true;
    }

    fn deactivate(&mut self, handle: &mut HeadlessCell) {
        handle.active = false;
    }

    fn set_position(&mut self, handle: &mut HeadlessCell, position: Vec3) {
        handle.position = position;
    }

    fn is_alive(&self, handle: &HeadlessCell) -> bool {
        !self.destroyed.contains(&handle.id)
    }
}
