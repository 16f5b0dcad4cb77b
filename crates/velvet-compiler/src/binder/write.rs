//! Member-write protocol.
//!
//! Resolution mirrors member reads: property setter first, then the
//! string-keyed indexer setter. A write with no resolvable target is
//! silently dropped - a documented limitation, not an error - and recorded
//! as a binding event.

use std::sync::Arc;

use velvet_core::{BindingEvent, BindingEvents, RuntimeError, TypeHash, Value, primitives};
use velvet_registry::{HostRegistry, PropertyLookup};

use super::{BoundOp, CallSite, CompiledBinding, with_receiver};
use crate::conversion::{can_convert, widen_value};

impl CallSite {
    /// Execute this site as a member write.
    ///
    /// Dropped writes return `Ok`; only host-callable faults propagate.
    pub fn write_member(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target: &Value,
        value: Value,
    ) -> Result<(), RuntimeError> {
        if target.is_absent() {
            return Ok(());
        }
        let Some(target_type) = target.type_hash() else {
            return Ok(());
        };

        let binding = match self.lookup(target_type, None) {
            Some(binding) => binding,
            None => self.bind_write(registry, events, target_type, &value),
        };

        match &binding.op {
            BoundOp::PropertySet(property) => {
                let Some(converted) = convert_for_slot(registry, &value, property.data_type)
                else {
                    // No safe conversion for this value: the write drops.
                    events.record(BindingEvent::SetMemberFailure {
                        member: self.name().to_string(),
                        target_type: registry.type_name(target_type),
                        value_type: value.type_name(),
                    });
                    return Ok(());
                };
                match with_receiver(target, |receiver| property.set(receiver, converted)) {
                    Some(Some(Ok(()))) => Ok(()),
                    Some(Some(Err(fault))) => Err(fault),
                    _ => Ok(()),
                }
            }
            BoundOp::StringIndexSet(indexer) => {
                let Some(converted) = convert_for_slot(registry, &value, indexer.params[1]) else {
                    events.record(BindingEvent::SetMemberFailure {
                        member: self.name().to_string(),
                        target_type: registry.type_name(target_type),
                        value_type: value.type_name(),
                    });
                    return Ok(());
                };
                let key = Value::Str(self.name().to_string());
                match with_receiver(target, |receiver| indexer.invoke(receiver, &[key, converted]))
                {
                    Some(Ok(_)) => Ok(()),
                    Some(Err(fault)) => Err(fault),
                    None => Ok(()),
                }
            }
            BoundOp::Unresolvable => Ok(()),
            _ => Err(RuntimeError::HostFault {
                member: self.name().to_string(),
                message: "call-site cache holds a mismatched operation".to_string(),
            }),
        }
    }

    fn bind_write(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target_type: TypeHash,
        value: &Value,
    ) -> Arc<CompiledBinding> {
        let op = match registry.find_property(target_type, self.name()) {
            PropertyLookup::Found(property) if property.can_write() => {
                BoundOp::PropertySet(property)
            }
            _ => {
                // Read-only, ambiguous, or missing: try the string-keyed
                // indexer setter, whose parameters are (key, value).
                let fallback = registry.indexer_sets(target_type).into_iter().find(|indexer| {
                    indexer.params.len() == 2 && indexer.params[0] == primitives::STRING
                });
                match fallback {
                    Some(indexer) => BoundOp::StringIndexSet(indexer),
                    None => {
                        events.record(BindingEvent::SetMemberFailure {
                            member: self.name().to_string(),
                            target_type: registry.type_name(target_type),
                            value_type: value.type_name(),
                        });
                        BoundOp::Unresolvable
                    }
                }
            }
        };
        self.install(target_type, None, op)
    }
}

/// Convert a value for a declared slot type, if any safe conversion exists.
fn convert_for_slot(registry: &HostRegistry, value: &Value, slot: TypeHash) -> Option<Value> {
    if !can_convert(registry, value.type_hash(), slot) {
        return None;
    }
    Some(widen_value(value, slot).unwrap_or_else(|| value.clone()))
}
