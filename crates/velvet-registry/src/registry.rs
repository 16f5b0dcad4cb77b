//! HostRegistry - the explicit registration table for host types.
//!
//! The template engine binds members reflectively, but the target language
//! has no ambient reflection, so embedders describe their types up front:
//! properties, method overloads, indexers, and subtype facts. The registry is
//! then the engine's whole view of the host world.
//!
//! # Thread Safety
//!
//! The registry is populated single-threaded during setup and is effectively
//! read-only afterwards. Rendering threads only call the `&self` query
//! methods. Embedders wanting concurrent registration must wrap it
//! themselves; the typical embedding never does.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use velvet_core::{RegistrationError, TypeHash, primitives};

use crate::member::{MemberCandidate, MemberFilter, MethodCandidate, PropertyCandidate};

/// Outcome of a property lookup.
///
/// Lookup is case-insensitive first; when that matches more than one property
/// an exact-case retry is attempted before reporting ambiguity.
#[derive(Debug, Clone)]
pub enum PropertyLookup {
    Found(Arc<PropertyCandidate>),
    NotFound,
    Ambiguous,
}

/// Everything the engine knows about one host type.
#[derive(Debug, Default)]
pub struct HostTypeEntry {
    /// Registered type name.
    pub name: String,
    /// Identity hash, derived from the name.
    pub type_hash: TypeHash,
    base: Option<TypeHash>,
    interfaces: Vec<TypeHash>,
    properties: Vec<Arc<PropertyCandidate>>,
    methods: Vec<Arc<MethodCandidate>>,
    indexer_gets: Vec<Arc<MethodCandidate>>,
    indexer_sets: Vec<Arc<MethodCandidate>>,
}

impl HostTypeEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hash: TypeHash::from_name(name),
            ..Default::default()
        }
    }

    /// Describe members for one of the engine's built-in value types, whose
    /// hashes are fixed (e.g. `primitives::STRING`). Members on value types
    /// receive a copy of the value and must not rely on receiver mutation.
    pub fn for_builtin(name: &str, type_hash: TypeHash) -> Self {
        Self {
            name: name.to_string(),
            type_hash,
            ..Default::default()
        }
    }

    /// Declare a base type. Members are inherited; values of this type are
    /// assignable where the base is expected.
    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.base = Some(base);
        self
    }

    /// Declare an implemented interface.
    pub fn with_interface(mut self, interface: TypeHash) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_property(mut self, property: PropertyCandidate) -> Self {
        self.properties.push(Arc::new(property));
        self
    }

    pub fn with_method(mut self, method: MethodCandidate) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    /// Declare an indexer read overload. `params` are the index types.
    pub fn with_indexer_get(mut self, indexer: MethodCandidate) -> Self {
        self.indexer_gets.push(Arc::new(indexer));
        self
    }

    /// Declare an indexer write overload. `params` are the index types
    /// followed by the value type.
    pub fn with_indexer_set(mut self, indexer: MethodCandidate) -> Self {
        self.indexer_sets.push(Arc::new(indexer));
        self
    }
}

/// The registration table.
#[derive(Debug, Default)]
pub struct HostRegistry {
    types: FxHashMap<TypeHash, HostTypeEntry>,
}

// Defense against registration cycles when walking base chains.
const MAX_BASE_DEPTH: usize = 32;

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host type. The base type, if declared, must already be
    /// registered.
    pub fn register_type(&mut self, entry: HostTypeEntry) -> Result<TypeHash, RegistrationError> {
        if self.types.contains_key(&entry.type_hash) {
            return Err(RegistrationError::DuplicateType {
                name: entry.name.clone(),
            });
        }
        if let Some(base) = entry.base {
            if !self.types.contains_key(&base) {
                return Err(RegistrationError::UnknownBase {
                    name: entry.name.clone(),
                });
            }
        }
        let hash = entry.type_hash;
        self.types.insert(hash, entry);
        Ok(hash)
    }

    /// Look up a registered type.
    pub fn get(&self, type_hash: TypeHash) -> Option<&HostTypeEntry> {
        self.types.get(&type_hash)
    }

    /// Readable name for a type hash, for diagnostics.
    pub fn type_name(&self, type_hash: TypeHash) -> String {
        if let Some(entry) = self.types.get(&type_hash) {
            return entry.name.clone();
        }
        primitives::name_of(type_hash)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{type_hash:?}"))
    }

    /// Enumerate members named `name` on `type_hash`, including inherited
    /// ones, according to `filter`.
    pub fn list_public_instance_members(
        &self,
        type_hash: TypeHash,
        name: &str,
        filter: MemberFilter,
    ) -> Vec<MemberCandidate> {
        let mut found = Vec::new();
        self.walk_chain(type_hash, |entry| {
            if filter.contains(MemberFilter::PROPERTIES) {
                for property in &entry.properties {
                    if filter.name_matches(&property.name, name) {
                        found.push(MemberCandidate::Property(Arc::clone(property)));
                    }
                }
            }
            if filter.contains(MemberFilter::METHODS) {
                for method in &entry.methods {
                    if filter.name_matches(&method.name, name) {
                        found.push(MemberCandidate::Method(Arc::clone(method)));
                    }
                }
            }
        });
        found
    }

    /// Resolve a property for member read/write.
    ///
    /// Case-insensitive first; on multiple matches an exact-case retry runs
    /// before the lookup is declared ambiguous.
    pub fn find_property(&self, type_hash: TypeHash, name: &str) -> PropertyLookup {
        let loose = self.properties_matching(type_hash, name, true);
        match loose.as_slice() {
            [] => PropertyLookup::NotFound,
            [single] => PropertyLookup::Found(Arc::clone(single)),
            _ => {
                let exact = self.properties_matching(type_hash, name, false);
                match exact.as_slice() {
                    [single] => PropertyLookup::Found(Arc::clone(single)),
                    _ => PropertyLookup::Ambiguous,
                }
            }
        }
    }

    fn properties_matching(
        &self,
        type_hash: TypeHash,
        name: &str,
        ignore_case: bool,
    ) -> Vec<Arc<PropertyCandidate>> {
        let mut found = Vec::new();
        self.walk_chain(type_hash, |entry| {
            for property in &entry.properties {
                let matched = if ignore_case {
                    property.name.eq_ignore_ascii_case(name)
                } else {
                    property.name == name
                };
                if matched {
                    found.push(Arc::clone(property));
                }
            }
        });
        found
    }

    /// Method overloads named `name` (case-insensitive), including inherited.
    pub fn methods_named(&self, type_hash: TypeHash, name: &str) -> Vec<Arc<MethodCandidate>> {
        let mut found = Vec::new();
        self.walk_chain(type_hash, |entry| {
            for method in &entry.methods {
                if method.name.eq_ignore_ascii_case(name) {
                    found.push(Arc::clone(method));
                }
            }
        });
        found
    }

    /// Indexer read overloads, including inherited.
    pub fn indexer_gets(&self, type_hash: TypeHash) -> Vec<Arc<MethodCandidate>> {
        let mut found = Vec::new();
        self.walk_chain(type_hash, |entry| {
            found.extend(entry.indexer_gets.iter().cloned());
        });
        found
    }

    /// Indexer write overloads, including inherited.
    pub fn indexer_sets(&self, type_hash: TypeHash) -> Vec<Arc<MethodCandidate>> {
        let mut found = Vec::new();
        self.walk_chain(type_hash, |entry| {
            found.extend(entry.indexer_sets.iter().cloned());
        });
        found
    }

    /// The single-string-parameter indexer used as the member-access
    /// fallback, if the type declares one.
    pub fn string_indexer(&self, type_hash: TypeHash) -> Option<Arc<MethodCandidate>> {
        self.indexer_gets(type_hash)
            .into_iter()
            .find(|indexer| matches!(indexer.params.as_slice(), [key] if *key == primitives::STRING))
    }

    /// Reference-widening facts: identity, the universal object root, base
    /// chain, and declared interfaces.
    pub fn is_assignable(&self, from: TypeHash, to: TypeHash) -> bool {
        if from == to || to == primitives::OBJECT {
            return true;
        }
        let mut current = from;
        for _ in 0..MAX_BASE_DEPTH {
            let Some(entry) = self.types.get(&current) else {
                return false;
            };
            if entry.interfaces.contains(&to) {
                return true;
            }
            match entry.base {
                Some(base) if base == to => return true,
                Some(base) => current = base,
                None => return false,
            }
        }
        false
    }

    /// Visit `type_hash` and its base chain, most-derived first.
    fn walk_chain(&self, type_hash: TypeHash, mut visit: impl FnMut(&HostTypeEntry)) {
        let mut current = Some(type_hash);
        for _ in 0..MAX_BASE_DEPTH {
            let Some(entry) = current.and_then(|hash| self.types.get(&hash)) else {
                return;
            };
            visit(entry);
            current = entry.base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::NativeFn;
    use velvet_core::Value;

    fn sample_registry() -> HostRegistry {
        let mut registry = HostRegistry::new();
        registry
            .register_type(
                HostTypeEntry::new("Person")
                    .with_property(PropertyCandidate::readonly::<String>(
                        "Name",
                        primitives::STRING,
                        |s| Value::Str(s.clone()),
                    )),
            )
            .unwrap();
        registry
            .register_type(
                HostTypeEntry::new("Employee")
                    .with_base(TypeHash::from_name("Person"))
                    .with_method(MethodCandidate::new(
                        "Pay",
                        vec![primitives::INT32],
                        primitives::VOID,
                        NativeFn::new(|_, _| Ok(Value::Null)),
                    )),
            )
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = sample_registry();
        let err = registry.register_type(HostTypeEntry::new("Person"));
        assert!(matches!(err, Err(RegistrationError::DuplicateType { .. })));
    }

    #[test]
    fn base_must_be_registered_first() {
        let mut registry = HostRegistry::new();
        let orphan = HostTypeEntry::new("Orphan").with_base(TypeHash::from_name("Missing"));
        assert!(matches!(
            registry.register_type(orphan),
            Err(RegistrationError::UnknownBase { .. })
        ));
    }

    #[test]
    fn members_are_inherited() {
        let registry = sample_registry();
        let employee = TypeHash::from_name("Employee");
        let found = registry.list_public_instance_members(
            employee,
            "name",
            MemberFilter::PROPERTIES | MemberFilter::IGNORE_CASE,
        );
        assert_eq!(found.len(), 1);
        assert!(matches!(
            registry.find_property(employee, "NAME"),
            PropertyLookup::Found(_)
        ));
    }

    #[test]
    fn case_sensitive_retry_disambiguates() {
        let mut registry = HostRegistry::new();
        registry
            .register_type(
                HostTypeEntry::new("Row")
                    .with_property(PropertyCandidate::readonly::<u32>("id", primitives::UINT32, |v| {
                        Value::U32(*v)
                    }))
                    .with_property(PropertyCandidate::readonly::<u32>("Id", primitives::UINT32, |v| {
                        Value::U32(*v)
                    })),
            )
            .unwrap();
        let row = TypeHash::from_name("Row");
        match registry.find_property(row, "Id") {
            PropertyLookup::Found(p) => assert_eq!(p.name, "Id"),
            other => panic!("expected exact-case disambiguation, got {other:?}"),
        }
        assert!(matches!(
            registry.find_property(row, "ID"),
            PropertyLookup::Ambiguous
        ));
    }

    #[test]
    fn assignability_walks_bases_and_interfaces() {
        let mut registry = HostRegistry::new();
        registry.register_type(HostTypeEntry::new("Printable")).unwrap();
        registry.register_type(HostTypeEntry::new("Animal")).unwrap();
        registry
            .register_type(
                HostTypeEntry::new("Dog")
                    .with_base(TypeHash::from_name("Animal"))
                    .with_interface(TypeHash::from_name("Printable")),
            )
            .unwrap();

        let dog = TypeHash::from_name("Dog");
        assert!(registry.is_assignable(dog, dog));
        assert!(registry.is_assignable(dog, TypeHash::from_name("Animal")));
        assert!(registry.is_assignable(dog, TypeHash::from_name("Printable")));
        assert!(registry.is_assignable(dog, primitives::OBJECT));
        assert!(!registry.is_assignable(TypeHash::from_name("Animal"), dog));
    }
}
