//! Dynamic beans produced by hydration.
//!
//! An [`Entity`] is a record of scalar properties plus named references and
//! collections to other entities. Beans are shared through [`EntityRef`]
//! handles whose identity is the allocation, not the content: two handles are
//! "the same bean" only if they point at the same cell.

use super::value::{EntityIdentifier, Value};
use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Default)]
pub struct Entity {
    entity_type: String,
    identifier: Option<EntityIdentifier>,
    properties: BTreeMap<String, Value>,
    references: BTreeMap<String, EntityRef>,
    back_references: BTreeMap<String, WeakEntityRef>,
    collections: BTreeMap<String, Vec<EntityRef>>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ..Default::default()
        }
    }

    pub fn with_identifier(mut self, identifier: EntityIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn identifier(&self) -> Option<&EntityIdentifier> {
        self.identifier.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn reference(&self, name: &str) -> Option<&EntityRef> {
        self.references.get(name)
    }

    pub fn set_reference(&mut self, name: impl Into<String>, target: EntityRef) {
        self.references.insert(name.into(), target);
    }

    pub fn back_reference(&self, name: &str) -> Option<EntityRef> {
        self.back_references.get(name).and_then(WeakEntityRef::upgrade)
    }

    pub fn set_back_reference(&mut self, name: impl Into<String>, target: &EntityRef) {
        self.back_references.insert(name.into(), target.downgrade());
    }

    pub fn collection(&self, name: &str) -> Option<&[EntityRef]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    /// Append to a collection, creating it on first use
    pub fn add_to_collection(&mut self, name: &str, element: EntityRef) {
        self.collections
            .entry(name.to_string())
            .or_default()
            .push(element);
    }
}

/// Identity key of a bean: the address of its shared cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey(usize);

/// Shared handle to a bean
#[derive(Clone)]
pub struct EntityRef(Rc<RefCell<Entity>>);

impl EntityRef {
    pub fn new(entity: Entity) -> Self {
        EntityRef(Rc::new(RefCell::new(entity)))
    }

    pub fn key(&self) -> EntityKey {
        EntityKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, Entity> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Entity> {
        self.0.borrow_mut()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, Entity>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    pub fn downgrade(&self) -> WeakEntityRef {
        WeakEntityRef(Rc::downgrade(&self.0))
    }

    pub fn entity_type(&self) -> String {
        self.0.borrow().entity_type.clone()
    }

    /// Render the graph reachable from this bean as JSON.
    /// A bean already present on the current path is rendered as `{"$ref": "Type#id"}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = HashSet::new();
        self.to_json_on_path(&mut path)
    }

    fn to_json_on_path(&self, path: &mut HashSet<EntityKey>) -> serde_json::Value {
        let entity = self.0.borrow();
        if !path.insert(self.key()) {
            return serde_json::json!({ "$ref": entity.display_key() });
        }

        let mut object = serde_json::Map::new();
        object.insert(
            "$type".to_string(),
            serde_json::Value::String(entity.entity_type.clone()),
        );
        for (name, value) in &entity.properties {
            object.insert(name.clone(), value.to_json());
        }
        for (name, target) in &entity.references {
            object.insert(name.clone(), target.to_json_on_path(path));
        }
        for (name, target) in &entity.back_references {
            if let Some(target) = target.upgrade() {
                let target = target.borrow();
                object.insert(
                    name.clone(),
                    serde_json::json!({ "$ref": target.display_key() }),
                );
            }
        }
        for (name, elements) in &entity.collections {
            let rendered = elements
                .iter()
                .map(|e| e.to_json_on_path(path))
                .collect();
            object.insert(name.clone(), serde_json::Value::Array(rendered));
        }

        path.remove(&self.key());
        serde_json::Value::Object(object)
    }
}

impl Entity {
    fn display_key(&self) -> String {
        match &self.identifier {
            Some(id) => format!("{}#{}", self.entity_type, id),
            None => self.entity_type.clone(),
        }
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entity) => write!(f, "EntityRef({})", entity.display_key()),
            Err(_) => write!(f, "EntityRef(<borrowed>)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WeakEntityRef(Weak<RefCell<Entity>>);

impl WeakEntityRef {
    pub fn upgrade(&self) -> Option<EntityRef> {
        self.0.upgrade().map(EntityRef)
    }
}

/// Insertion-ordered set of beans compared by reference identity.
///
/// Partially hydrated beans have unstable content, so value equality cannot
/// be used to deduplicate them.
#[derive(Debug, Default, Clone)]
pub struct EntitySet {
    keys: HashSet<EntityKey>,
    entities: Vec<EntityRef>,
}

impl EntitySet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Returns false if the bean was already present
    pub fn insert(&mut self, entity: EntityRef) -> bool {
        if self.keys.insert(entity.key()) {
            self.entities.push(entity);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.keys.contains(&entity.key())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> {
        self.entities.iter()
    }

    pub fn into_vec(self) -> Vec<EntityRef> {
        self.entities
    }
}

impl IntoIterator for EntitySet {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
