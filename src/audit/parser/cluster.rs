//! Live cluster resource provider.
//!
//! Lists every audited kind through the Kubernetes API and feeds the typed
//! objects through the same decoder as manifest documents.

use crate::audit::context::ResourceSet;
use crate::audit::parser::yaml::decode_object;
use crate::error::Result;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{Namespace, Pod, ReplicationController};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{
    Client, Config, Resource,
    api::{Api, ListParams},
};
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Reads audit inputs from a cluster.
pub struct ClusterProvider {
    client: Client,
}

impl ClusterProvider {
    /// Connect using the inferred config, or a named kubeconfig context.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        // The API client needs a process-wide TLS provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let config = match context {
            Some(context) => {
                let kubeconfig = kube::config::Kubeconfig::read()?;
                Config::from_custom_kubeconfig(
                    kubeconfig,
                    &kube::config::KubeConfigOptions {
                        context: Some(context.to_string()),
                        ..Default::default()
                    },
                )
                .await?
            }
            None => Config::infer().await?,
        };
        info!("Connecting to cluster at {}", config.cluster_url);
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    /// Fetch every audited object in `namespace` (empty for all).
    pub async fn fetch(&self, namespace: &str) -> Result<ResourceSet> {
        let mut resources = ResourceSet::new();

        self.collect(&mut resources, self.list_namespaced::<Pod>(namespace).await?)?;
        self.collect(&mut resources, self.list_namespaced::<Deployment>(namespace).await?)?;
        self.collect(&mut resources, self.list_namespaced::<DaemonSet>(namespace).await?)?;
        self.collect(&mut resources, self.list_namespaced::<StatefulSet>(namespace).await?)?;
        self.collect(
            &mut resources,
            self.list_namespaced::<ReplicationController>(namespace).await?,
        )?;
        self.collect(&mut resources, self.list_namespaced::<CronJob>(namespace).await?)?;
        self.collect(&mut resources, self.list_namespaced::<NetworkPolicy>(namespace).await?)?;

        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        self.collect(&mut resources, namespaces.list(&ListParams::default()).await?.items)?;

        resources.retain_namespace(namespace);
        debug!("Fetched {} objects from the cluster", resources.len());
        Ok(resources)
    }

    async fn list_namespaced<K>(&self, namespace: &str) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = if namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), namespace)
        };
        Ok(api.list(&ListParams::default()).await?.items)
    }

    fn collect<K: Serialize>(&self, resources: &mut ResourceSet, items: Vec<K>) -> Result<()> {
        for item in items {
            let value = serde_yaml::to_value(&item)?;
            match decode_object(&value) {
                Some(object) => resources.add_object(object),
                None => warn!("Skipping cluster object without apiVersion/kind"),
            }
        }
        Ok(())
    }
}
