//! Render configuration.
//!
//! Two prop tables decide how a native element prop is applied:
//!
//! - element-state properties (`value`, `className` by default) are written
//!   as live properties on every render, because user interaction can change
//!   them behind the virtual tree's back;
//! - event props (`onClick`, `onInput`, `onSubmit` by default) map to native
//!   event names and are wired as listeners.
//!
//! Everything else is an attribute.

use web_time::Duration;

#[derive(Clone, Debug)]
pub struct RenderOptions {
    root_tag: String,
    element_properties: Vec<String>,
    events: Vec<(String, String)>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            root_tag: "div".to_string(),
            element_properties: vec!["value".to_string(), "className".to_string()],
            events: vec![
                ("onClick".to_string(), "click".to_string()),
                ("onInput".to_string(), "input".to_string()),
                ("onSubmit".to_string(), "submit".to_string()),
            ],
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag of the implicit container wrapping every rendered tree.
    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into();
        self
    }

    pub fn with_element_property(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.is_element_property(&name) {
            self.element_properties.push(name);
        }
        self
    }

    /// Maps a prop name (e.g. `onChange`) to a native event (e.g. `change`).
    pub fn with_event(mut self, prop: impl Into<String>, event: impl Into<String>) -> Self {
        let prop = prop.into();
        let event = event.into();
        match self.events.iter_mut().find(|(p, _)| *p == prop) {
            Some(entry) => entry.1 = event,
            None => self.events.push((prop, event)),
        }
        self
    }

    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    pub fn is_element_property(&self, name: &str) -> bool {
        self.element_properties.iter().any(|p| p == name)
    }

    pub fn event_for(&self, prop: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|(p, _)| p == prop)
            .map(|(_, event)| event.as_str())
    }
}

/// What one commit did to the presentation tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    pub created: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
    pub text_updates: usize,
    pub attribute_writes: usize,
    pub property_writes: usize,
    pub listener_changes: usize,
    pub evaluated: usize,
    pub unmounted: usize,
    pub recovered: usize,
    pub duration: Duration,
}

impl RenderStats {
    /// Mutations other than element-state property writes.
    pub fn mutations(&self) -> usize {
        self.created
            + self.inserted
            + self.replaced
            + self.removed
            + self.text_updates
            + self.attribute_writes
            + self.listener_changes
    }
}
