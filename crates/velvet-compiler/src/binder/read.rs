//! Member-read protocol.
//!
//! Resolution order: property (case-insensitive, with an exact-case retry on
//! ambiguity), then the single-string-parameter indexer, then the
//! unresolvable sentinel. A sentinel never aborts rendering - the output
//! pipeline substitutes the literal reference text.

use std::sync::Arc;

use velvet_core::{BindingEvent, BindingEvents, RuntimeError, TypeHash, Value};
use velvet_registry::{HostRegistry, PropertyLookup};

use super::{BoundOp, CallSite, CompiledBinding, with_receiver};

impl CallSite {
    /// Execute this site as a member read.
    ///
    /// Never fails for unresolved members; only host-callable faults
    /// propagate.
    pub fn read_member(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target: &Value,
    ) -> Result<Value, RuntimeError> {
        match target {
            // Reading off the absent value stays absent; reading off the
            // sentinel cascades it.
            Value::Null => return Ok(Value::Null),
            Value::Unresolvable => return Ok(Value::Unresolvable),
            // Built-in maps answer member reads by key, matching their
            // indexer semantics.
            Value::Map(entries) => {
                return Ok(entries.get(self.name()).cloned().unwrap_or(Value::Unresolvable));
            }
            _ => {}
        }

        let Some(target_type) = target.type_hash() else {
            return Ok(Value::Null);
        };

        let binding = match self.lookup(target_type, None) {
            Some(binding) => binding,
            None => self.bind_read(registry, events, target_type),
        };

        match &binding.op {
            BoundOp::PropertyGet(property) => {
                match with_receiver(target, |receiver| property.get(receiver)) {
                    Some(Some(Ok(value))) => Ok(value),
                    Some(Some(Err(fault))) => Err(fault),
                    _ => Ok(Value::Unresolvable),
                }
            }
            BoundOp::StringIndexGet(indexer) => {
                let key = Value::Str(self.name().to_string());
                match with_receiver(target, |receiver| indexer.invoke(receiver, &[key])) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(fault)) => Err(fault),
                    None => Ok(Value::Unresolvable),
                }
            }
            BoundOp::Unresolvable => Ok(Value::Unresolvable),
            _ => Err(RuntimeError::HostFault {
                member: self.name().to_string(),
                message: "call-site cache holds a mismatched operation".to_string(),
            }),
        }
    }

    fn bind_read(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target_type: TypeHash,
    ) -> Arc<CompiledBinding> {
        let op = match registry.find_property(target_type, self.name()) {
            PropertyLookup::Found(property) if property.can_read() => {
                BoundOp::PropertyGet(property)
            }
            PropertyLookup::Ambiguous => {
                events.record(BindingEvent::GetMemberAmbiguous {
                    member: self.name().to_string(),
                    target_type: registry.type_name(target_type),
                });
                BoundOp::Unresolvable
            }
            // Not found, or found but write-only: fall back to the
            // string-keyed indexer.
            _ => match registry.string_indexer(target_type) {
                Some(indexer) => BoundOp::StringIndexGet(indexer),
                None => {
                    events.record(BindingEvent::GetMemberFailure {
                        member: self.name().to_string(),
                        target_type: registry.type_name(target_type),
                    });
                    BoundOp::Unresolvable
                }
            },
        };
        self.install(target_type, None, op)
    }
}
