//! Decoded Kubernetes objects handed to the auditor by a resource provider.

pub mod object;

pub use object::{GroupVersionKind, K8sObject, NetworkPolicyData, ObjectMeta, PodSpec};

/// The set of raw objects an audit run works on.
#[derive(Debug, Default, Clone)]
pub struct ResourceSet {
    objects: Vec<K8sObject>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: K8sObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[K8sObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Keep only objects that belong to `namespace` (empty keeps all).
    pub fn retain_namespace(&mut self, namespace: &str) {
        self.objects.retain(|o| o.is_in_namespace(namespace));
    }

    /// All decoded network policies.
    pub fn network_policies(&self) -> impl Iterator<Item = &NetworkPolicyData> {
        self.objects.iter().filter_map(|o| match o {
            K8sObject::NetworkPolicyV1(np) => Some(&**np),
            _ => None,
        })
    }
}

impl FromIterator<K8sObject> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = K8sObject>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}
