//! Method-invocation and indexer protocols.
//!
//! Invocation resolves against the runtime types observed at the call, not
//! any static types: a null argument carries an absent marker so overload
//! selection can run null-aware conversions. The cached fragment is guarded
//! by both the target type and the observed argument shape.

use std::sync::Arc;

use velvet_core::{BindingEvent, BindingEvents, RuntimeError, TypeHash, Value};
use velvet_registry::HostRegistry;

use super::{BoundOp, CallSite, CompiledBinding, assemble_arguments, format_arg_types, with_receiver};
use crate::overload::{BindingResult, resolve_candidates, resolve_method};

impl CallSite {
    /// Execute this site as a method invocation.
    pub fn invoke_member(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match target {
            Value::Null => return Ok(Value::Null),
            Value::Unresolvable => return Ok(Value::Unresolvable),
            _ => {}
        }
        let Some(target_type) = target.type_hash() else {
            return Ok(Value::Null);
        };
        let shape: Box<[Option<TypeHash>]> = args.iter().map(Value::type_hash).collect();

        let binding = match self.lookup(target_type, Some(&shape)) {
            Some(binding) => binding,
            None => {
                let resolution = resolve_method(registry, target_type, self.name(), &shape);
                self.bind_call(registry, events, target_type, shape, resolution)
            }
        };

        self.execute_call(target, args, &binding)
    }

    /// Execute this site as an indexer read: `target[args]`.
    pub fn index_get(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match target {
            Value::Null => return Ok(Value::Null),
            Value::Unresolvable => return Ok(Value::Unresolvable),
            _ => {}
        }
        let Some(target_type) = target.type_hash() else {
            return Ok(Value::Null);
        };
        let shape: Box<[Option<TypeHash>]> = args.iter().map(Value::type_hash).collect();

        let binding = match self.lookup(target_type, Some(&shape)) {
            Some(binding) => binding,
            None => {
                let resolution =
                    resolve_candidates(registry, &registry.indexer_gets(target_type), &shape);
                self.bind_call(registry, events, target_type, shape, resolution)
            }
        };

        self.execute_call(target, args, &binding)
    }

    /// Execute this site as an indexer write: `target[indices] = value`.
    ///
    /// `args` is the index list followed by the written value.
    pub fn index_set(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target: &Value,
        args: &[Value],
    ) -> Result<(), RuntimeError> {
        if target.is_absent() {
            return Ok(());
        }
        let Some(target_type) = target.type_hash() else {
            return Ok(());
        };
        let shape: Box<[Option<TypeHash>]> = args.iter().map(Value::type_hash).collect();

        let binding = match self.lookup(target_type, Some(&shape)) {
            Some(binding) => binding,
            None => {
                let resolution =
                    resolve_candidates(registry, &registry.indexer_sets(target_type), &shape);
                self.bind_store(registry, events, target_type, shape, resolution)
            }
        };

        match &binding.op {
            BoundOp::Store { candidate, conversions } => {
                let call_args = assemble_arguments(candidate, conversions, args);
                match with_receiver(target, |receiver| candidate.invoke(receiver, &call_args)) {
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

    fn execute_call(
        &self,
        target: &Value,
        args: &[Value],
        binding: &CompiledBinding,
    ) -> Result<Value, RuntimeError> {
        match &binding.op {
            BoundOp::Call { candidate, conversions } => {
                let call_args = assemble_arguments(candidate, conversions, args);
                let result =
                    with_receiver(target, |receiver| candidate.invoke(receiver, &call_args));
                match result {
                    Some(Ok(value)) => {
                        // A void member still yields a renderable value: the
                        // empty string, never null or the sentinel.
                        if candidate.returns_void() {
                            Ok(Value::Str(String::new()))
                        } else {
                            Ok(value)
                        }
                    }
                    Some(Err(fault)) => Err(fault),
                    None => Ok(Value::Null),
                }
            }
            BoundOp::Unresolvable => Ok(Value::Unresolvable),
            _ => Err(RuntimeError::HostFault {
                member: self.name().to_string(),
                message: "call-site cache holds a mismatched operation".to_string(),
            }),
        }
    }

    fn bind_call(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target_type: TypeHash,
        shape: Box<[Option<TypeHash>]>,
        resolution: BindingResult,
    ) -> Arc<CompiledBinding> {
        let op = match resolution {
            BindingResult::Found { candidate, conversions } => BoundOp::Call {
                candidate,
                conversions,
            },
            BindingResult::NotFound => {
                events.record(BindingEvent::InvokeMemberFailure {
                    member: self.name().to_string(),
                    target_type: registry.type_name(target_type),
                    arg_types: format_arg_types(registry, &shape),
                });
                BoundOp::Unresolvable
            }
            BindingResult::Ambiguous => {
                events.record(BindingEvent::InvokeMemberAmbiguous {
                    member: self.name().to_string(),
                    target_type: registry.type_name(target_type),
                    arg_types: format_arg_types(registry, &shape),
                });
                BoundOp::Unresolvable
            }
        };
        self.install(target_type, Some(shape), op)
    }

    fn bind_store(
        &self,
        registry: &HostRegistry,
        events: &BindingEvents,
        target_type: TypeHash,
        shape: Box<[Option<TypeHash>]>,
        resolution: BindingResult,
    ) -> Arc<CompiledBinding> {
        let op = match resolution {
            BindingResult::Found { candidate, conversions } => BoundOp::Store {
                candidate,
                conversions,
            },
            _ => {
                events.record(BindingEvent::SetMemberFailure {
                    member: self.name().to_string(),
                    target_type: registry.type_name(target_type),
                    value_type: shape
                        .last()
                        .and_then(|hash| *hash)
                        .map(|hash| registry.type_name(hash))
                        .unwrap_or_else(|| "null".to_string()),
                });
                BoundOp::Unresolvable
            }
        };
        self.install(target_type, Some(shape), op)
    }
}
