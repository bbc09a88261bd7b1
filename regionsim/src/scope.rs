use std::collections::BTreeMap;

use fieldio::{Namespace, Value};

use crate::config::Property;

/// The namespace scope enclosing every configured region.
#[derive(Debug, Default)]
pub struct Scope {
    properties: BTreeMap<String, Property>,
}

impl Scope {
    pub fn new(properties: BTreeMap<String, Property>) -> Self {
        Self { properties }
    }
}

impl Namespace for Scope {
    fn lookup_property(&self, name: &str) -> Option<Value<'_>> {
        self.properties.get(name).map(|p| match p {
            Property::Integer(n) => Value::Integer(*n),
            Property::String(s) => Value::String(s),
            Property::Buffer(b) => Value::Buffer(b),
        })
    }
}
