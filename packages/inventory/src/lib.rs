// ABOUTME: Component inventory domain package
// ABOUTME: Types and SQLite storage for lab hardware components

pub mod storage;
pub mod types;

pub use storage::{ComponentStorage, InventoryError, InventoryResult};
pub use types::{
    CategoryCount, Component, ComponentCategory, ComponentCreateInput, ComponentFilter,
    ComponentStatus, ComponentUpdateInput,
};
