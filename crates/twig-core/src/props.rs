use std::collections::BTreeSet;

use crate::error::Result;
use crate::node::{Element, Handler, PropValue};
use crate::presentation::Presentation;
use crate::reconcile::Reconciler;

fn defined<'e>(el: Option<&'e Element>, name: &str) -> Option<&'e PropValue> {
    el.and_then(|el| el.props.get(name))
        .filter(|value| !matches!(value, PropValue::Undefined))
}

impl<D: Presentation> Reconciler<'_, D> {
    /// Brings the live node's attributes, properties and listeners from
    /// `prev`'s props to `next`'s. `prev` is `None` for a freshly created node.
    pub(crate) fn patch_props(
        &mut self,
        live: &D::Node,
        prev: Option<&Element>,
        next: &Element,
    ) -> Result<()> {
        let options = self.options;
        let names: BTreeSet<&str> = next
            .props
            .keys()
            .chain(prev.into_iter().flat_map(|el| el.props.keys()))
            .map(String::as_str)
            .collect();

        for name in names {
            let old = defined(prev, name);
            let new = defined(Some(next), name);

            // The live value may have drifted (typing into an input), so
            // element state is written even when the virtual value did not change.
            if options.is_element_property(name) {
                let value = new.map(PropValue::to_property_string).unwrap_or_default();
                self.doc.set_property(live, name, &value)?;
                self.stats.property_writes += 1;
                continue;
            }
            if old == new {
                continue;
            }
            match options.event_for(name) {
                Some(event) => self.patch_listener(
                    live,
                    event,
                    old.and_then(PropValue::as_handler),
                    new.and_then(PropValue::as_handler),
                )?,
                None => self.patch_attribute(live, name, old, new)?,
            }
        }
        Ok(())
    }

    fn patch_listener(
        &mut self,
        live: &D::Node,
        event: &str,
        old: Option<&Handler>,
        new: Option<&Handler>,
    ) -> Result<()> {
        if let Some(old) = old {
            self.doc.remove_listener(live, event, old)?;
            self.stats.listener_changes += 1;
        }
        if let Some(new) = new {
            self.doc.add_listener(live, event, new)?;
            self.stats.listener_changes += 1;
        }
        Ok(())
    }

    fn patch_attribute(
        &mut self,
        live: &D::Node,
        name: &str,
        old: Option<&PropValue>,
        new: Option<&PropValue>,
    ) -> Result<()> {
        if let Some(PropValue::Handler(_)) = new {
            log::warn!("`{name}` holds a handler but is not a known event prop; skipping");
            return Ok(());
        }
        let old = old.and_then(attribute_value);
        let new = new.and_then(attribute_value);
        if old == new {
            return Ok(());
        }
        match new {
            Some(value) => self.doc.set_attribute(live, name, &value)?,
            None => self.doc.remove_attribute(live, name)?,
        }
        self.stats.attribute_writes += 1;
        Ok(())
    }
}

/// Serialized attribute value; `None` means the attribute is absent.
fn attribute_value(value: &PropValue) -> Option<String> {
    match value {
        PropValue::Str(s) => Some(s.clone()),
        PropValue::Number(n) => Some(n.to_string()),
        PropValue::Bool(true) => Some(String::new()),
        PropValue::Bool(false) | PropValue::Handler(_) | PropValue::Undefined => None,
    }
}
