use crate::error::{Error, Result};
use crate::hooks::{EffectRecord, Frame, FrameGuard, HookRegistry, InstanceKey, PendingEffect};
use crate::node::{Component, Node};
use crate::schedule::RenderRequest;

impl HookRegistry {
    /// Evaluates `component` as the instance `key` and returns its output.
    ///
    /// Effects are committed after the body returns: an effect whose deps
    /// equal the previous evaluation's keeps the old cleanup and is skipped;
    /// any other effect runs the old cleanup, then its callback.
    pub fn mount<'n>(
        &mut self,
        component: &'n mut Component,
        key: &InstanceKey,
        request: &RenderRequest,
    ) -> Result<&'n mut Node> {
        let slots = self.states.remove(key).unwrap_or_default();
        let expected = self.signatures.get(key).cloned();
        let previous_effects = self.effects.remove(key);

        let guard = FrameGuard::enter(Frame::new(
            component.name(),
            slots,
            expected,
            request.clone(),
        ));
        let output = component.invoke();
        let mut frame = guard.exit().ok_or(Error::InvalidHookContext)?;
        frame.finish();

        let Frame {
            slots,
            signature,
            effects,
            violation,
            ..
        } = frame;
        self.states.insert(key.clone(), slots);

        if let Some(index) = violation {
            // Left in place so the unmount that follows runs their cleanups.
            if let Some(previous) = previous_effects {
                self.effects.insert(key.clone(), previous);
            }
            return Err(Error::HookOrderViolation {
                component: component.name(),
                index,
            });
        }

        let first_mount = !self.signatures.contains_key(key);
        self.signatures.insert(key.clone(), signature);

        let committed = commit_effects(previous_effects.unwrap_or_default(), effects);
        if !committed.is_empty() {
            self.effects.insert(key.clone(), committed);
        }

        if first_mount {
            log::debug!("mounted {} at {:?}", component.name(), key.path);
        }
        Ok(component.result.insert(Box::new(output)).as_mut())
    }

    /// Runs every pending cleanup of `key` and forgets its state, returning
    /// the component's last output.
    pub fn unmount<'n>(&mut self, component: &'n Component, key: &InstanceKey) -> Option<&'n Node> {
        let effects = self.effects.remove(key);
        let had_state = self.states.remove(key).is_some();
        let had_signature = self.signatures.remove(key).is_some();

        if let Some(effects) = effects {
            for effect in effects {
                effect.run_cleanup();
            }
        }
        if had_state || had_signature {
            log::debug!("unmounted {} at {:?}", component.name(), key.path);
        }
        component.result()
    }
}

fn commit_effects(previous: Vec<EffectRecord>, pending: Vec<PendingEffect>) -> Vec<EffectRecord> {
    let mut previous = previous.into_iter();
    let mut committed = Vec::with_capacity(pending.len());

    for PendingEffect { callback, deps } in pending {
        let cleanup = match previous.next() {
            Some(prev) if prev.deps == deps => prev.cleanup,
            prev => {
                if let Some(prev) = prev {
                    prev.run_cleanup();
                }
                callback()
            }
        };
        committed.push(EffectRecord { deps, cleanup });
    }

    // Effects past the new list's length are dropped, cleanups first.
    for stale in previous {
        stale.run_cleanup();
    }
    committed
}
