use serde::{Deserialize, Serialize};

use crate::model::ContainerRef;

pub const BREADCRUMB_SEPARATOR: &str = " ⏵ ";
pub const ROOT_LABEL: &str = "Root";

/// Root-to-current path of entered containers.
///
/// The top is the container whose children are on display; an empty stack
/// is the virtual root of the library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationStack {
    entries: Vec<ContainerRef>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, container: ContainerRef) {
        self.entries.push(container);
    }

    pub fn pop(&mut self) -> Option<ContainerRef> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&ContainerRef> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerRef> {
        self.entries.iter()
    }

    pub fn breadcrumb(&self) -> String {
        if self.entries.is_empty() {
            return ROOT_LABEL.to_string();
        }
        self.entries
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(BREADCRUMB_SEPARATOR)
    }

    pub fn into_vec(self) -> Vec<ContainerRef> {
        self.entries
    }
}

impl From<Vec<ContainerRef>> for NavigationStack {
    fn from(entries: Vec<ContainerRef>) -> Self {
        Self { entries }
    }
}
