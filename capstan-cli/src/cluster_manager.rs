//! Cluster lifecycle operations on top of clusterctl and kubectl.
//!
//! Manifests referenced by the cluster spec are applied as-is. Custom resources describing the
//! cluster are rendered to JSON under the writer's directory and applied from there, so every
//! object sent to a cluster is also left on disk for inspection.

use anyhow::{Context, Result};
use capstan_core::cluster::{bootstrap_cluster_name, PAUSED_ANNOTATION, SYSTEM_NAMESPACE};
use capstan_core::executables::{Clusterctl, Kubectl};
use capstan_core::filewriter::FileWriter;
use capstan_core::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};
use capstan_hal::ProcessOps;
use capstan_workflow::interfaces::{ClusterManager, Provider};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const API_GROUP: &str = "anywhere.capstan.io";
const API_VERSION: &str = "anywhere.capstan.io/v1alpha1";
const RESOURCE_NAMESPACE: &str = "default";

pub struct ClusterctlManager {
    clusterctl: Clusterctl,
    kubectl: Kubectl,
    writer: Arc<dyn FileWriter>,
}

impl ClusterctlManager {
    pub fn new(hal: Arc<dyn ProcessOps>, writer: Arc<dyn FileWriter>) -> Self {
        Self {
            clusterctl: Clusterctl::new(Arc::clone(&hal)),
            kubectl: Kubectl::new(hal),
            writer,
        }
    }

    fn apply_optional(&self, cluster: &Cluster, manifest: Option<&Path>, what: &str) -> Result<()> {
        match manifest {
            Some(path) => self.kubectl.apply_file(cluster, path),
            None => {
                log::debug!("No {} manifest configured, skipping", what);
                Ok(())
            }
        }
    }
}

fn resource(kind: &str, name: &str, annotations: &BTreeMap<String, String>, spec: Value) -> Value {
    json!({
        "apiVersion": API_VERSION,
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": RESOURCE_NAMESPACE,
            "annotations": annotations,
        },
        "spec": spec,
    })
}

/// Cluster, datacenter and machine resources as one `List` document.
fn eksa_resources(
    spec: &ClusterSpec,
    datacenter: &DatacenterConfig,
    machines: &[MachineConfig],
) -> Result<Value> {
    let cluster_spec = serde_json::to_value(spec).context("Failed to serialize cluster spec")?;
    let mut items = vec![
        resource("Cluster", &spec.name, &spec.annotations, cluster_spec),
        resource(
            &datacenter.kind,
            &datacenter.name,
            &datacenter.annotations,
            datacenter.spec.clone(),
        ),
    ];
    items.extend(
        machines
            .iter()
            .map(|m| resource(&m.kind, &m.name, &BTreeMap::new(), m.spec.clone())),
    );
    Ok(json!({"apiVersion": "v1", "kind": "List", "items": items}))
}

fn resource_ref(kind: &str, name: &str) -> String {
    format!("{}.{}/{}", kind.to_lowercase(), API_GROUP, name)
}

impl ClusterManager for ClusterctlManager {
    fn install_capi(&self, spec: &ClusterSpec, cluster: &Cluster, provider: &dyn Provider) -> Result<()> {
        self.clusterctl
            .init_infrastructure(spec, cluster, provider.name(), &[])
    }

    fn create_workload_cluster(
        &self,
        bootstrap: &Cluster,
        spec: &ClusterSpec,
        _provider: &dyn Provider,
    ) -> Result<Cluster> {
        self.kubectl.apply_file(bootstrap, &spec.manifests.workload)?;
        self.kubectl
            .wait_for_control_plane_ready(bootstrap, &spec.name, SYSTEM_NAMESPACE)?;

        let kubeconfig = self.clusterctl.get_workload_kubeconfig(&spec.name, bootstrap)?;
        let path = self.writer.write(
            &format!("{}.kubeconfig", bootstrap_cluster_name(&spec.name)),
            kubeconfig.as_bytes(),
        )?;
        log::info!("🔑 Workload kubeconfig written to {}", path.display());
        Ok(Cluster::new(spec.name.clone()).with_kubeconfig(path))
    }

    fn install_networking(&self, cluster: &Cluster, spec: &ClusterSpec) -> Result<()> {
        self.kubectl.apply_file(cluster, &spec.manifests.networking)
    }

    fn install_storage_class(&self, cluster: &Cluster, spec: &ClusterSpec, _provider: &dyn Provider) -> Result<()> {
        self.apply_optional(cluster, spec.manifests.storage_class.as_deref(), "storage class")
    }

    fn install_machine_health_checks(
        &self,
        bootstrap: &Cluster,
        spec: &ClusterSpec,
        _provider: &dyn Provider,
    ) -> Result<()> {
        self.apply_optional(
            bootstrap,
            spec.manifests.machine_health_checks.as_deref(),
            "machine health check",
        )
    }

    fn move_capi(&self, from: &Cluster, to: &Cluster) -> Result<()> {
        self.clusterctl.move_management(from, to)?;
        self.kubectl
            .wait_for_control_plane_ready(to, &to.name, SYSTEM_NAMESPACE)
    }

    fn install_custom_components(&self, spec: &ClusterSpec, cluster: &Cluster) -> Result<()> {
        self.kubectl
            .apply_file(cluster, &spec.manifests.custom_components)
    }

    fn create_eksa_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        datacenter: &DatacenterConfig,
        machines: &[MachineConfig],
    ) -> Result<()> {
        let doc = eksa_resources(spec, datacenter, machines)?;
        let payload = serde_json::to_vec_pretty(&doc).context("Failed to render cluster resources")?;
        let path = self
            .writer
            .write(&format!("{}-resources.json", spec.name), &payload)?;
        self.kubectl.apply_file(cluster, &path)
    }

    fn resume_eksa_controller_reconcile(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        provider: &dyn Provider,
    ) -> Result<()> {
        let datacenter = provider.datacenter_config();
        for target in [
            resource_ref(&datacenter.kind, &datacenter.name),
            resource_ref("Cluster", &spec.name),
        ] {
            self.kubectl
                .remove_annotation(cluster, &target, PAUSED_ANNOTATION, RESOURCE_NAMESPACE)?;
        }
        Ok(())
    }

    fn save_logs(&self, bootstrap: Option<&Cluster>) -> Result<()> {
        let Some(bootstrap) = bootstrap else {
            log::debug!("No bootstrap cluster, no logs to collect");
            return Ok(());
        };
        let dir = self.writer.dir().join("logs").join(&bootstrap.name);
        self.kubectl.dump_cluster_info(bootstrap, &dir)?;
        log::info!("📦 Bootstrap cluster logs saved to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::filewriter::DirWriter;
    use capstan_hal::FakeHal;
    use capstan_workflow::testing::{spec, Fakes};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn manager(hal: &FakeHal, out: &Path) -> ClusterctlManager {
        let writer = DirWriter::for_cluster(out, "prod").unwrap();
        ClusterctlManager::new(Arc::new(hal.clone()), Arc::new(writer))
    }

    #[test]
    fn workload_cluster_gets_written_kubeconfig() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        hal.respond("clusterctl", Some("get"), "apiVersion: v1\nkind: Config\n");
        let fakes = Fakes::new();
        let bootstrap = Cluster::new("prod-eks-a-cluster").with_kubeconfig("/k/boot");

        let workload = manager(&hal, out.path())
            .create_workload_cluster(&bootstrap, &spec("prod"), &fakes.provider)
            .unwrap();

        let expected = out.path().join("prod").join("prod-eks-a-cluster.kubeconfig");
        assert_eq!(workload.kubeconfig, Some(expected.clone()));
        assert_eq!(
            std::fs::read_to_string(expected).unwrap(),
            "apiVersion: v1\nkind: Config\n"
        );
        let kubectl = hal.invocations("kubectl");
        assert_eq!(kubectl[0][..3], ["apply", "-f", "workload.yaml"]);
        assert_eq!(kubectl[1][0], "wait");
    }

    #[test]
    fn optional_manifests_are_skipped() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        let fakes = Fakes::new();
        let m = manager(&hal, out.path());
        let cluster = Cluster::new("prod");

        m.install_storage_class(&cluster, &spec("prod"), &fakes.provider).unwrap();
        assert_eq!(hal.operation_count(), 0);

        let mut with_sc = spec("prod");
        with_sc.manifests.storage_class = Some(PathBuf::from("sc.yaml"));
        m.install_storage_class(&cluster, &with_sc, &fakes.provider).unwrap();
        assert_eq!(hal.invocations("kubectl")[0][2], "sc.yaml");
    }

    #[test]
    fn resources_document_keeps_pause_annotations() {
        let mut spec = spec("prod");
        spec.pause_reconcile();
        let mut dc = DatacenterConfig::new("DockerDatacenterConfig", "prod", json!({}));
        dc.pause_reconcile();
        let machines = [MachineConfig {
            kind: "DockerMachineConfig".to_string(),
            name: "prod-cp".to_string(),
            spec: json!({"cpus": 2}),
        }];

        let doc = eksa_resources(&spec, &dc, &machines).unwrap();

        let items = doc["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["kind"], "Cluster");
        assert_eq!(items[0]["metadata"]["annotations"][PAUSED_ANNOTATION], "true");
        assert_eq!(items[1]["metadata"]["annotations"][PAUSED_ANNOTATION], "true");
        assert_eq!(items[2]["spec"]["cpus"], 2);
    }

    #[test]
    fn create_resources_applies_rendered_file() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        let dc = DatacenterConfig::new("DockerDatacenterConfig", "prod", json!({}));

        manager(&hal, out.path())
            .create_eksa_resources(&Cluster::new("prod"), &spec("prod"), &dc, &[])
            .unwrap();

        let rendered = out.path().join("prod").join("prod-resources.json");
        assert!(rendered.exists());
        assert_eq!(
            hal.invocations("kubectl")[0][2],
            rendered.display().to_string()
        );
    }

    #[test]
    fn resume_removes_pause_from_datacenter_and_cluster() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        let fakes = Fakes::new();

        manager(&hal, out.path())
            .resume_eksa_controller_reconcile(&Cluster::new("prod"), &spec("prod"), &fakes.provider)
            .unwrap();

        let targets: Vec<_> = hal
            .invocations("kubectl")
            .into_iter()
            .map(|args| args[1].clone())
            .collect();
        assert_eq!(
            targets,
            [
                "dockerdatacenterconfig.anywhere.capstan.io/fake-dc",
                "cluster.anywhere.capstan.io/prod"
            ]
        );
    }

    #[test]
    fn save_logs_without_bootstrap_does_nothing() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        manager(&hal, out.path()).save_logs(None).unwrap();
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn save_logs_dumps_bootstrap_cluster() {
        let out = tempdir().unwrap();
        let hal = FakeHal::new();
        manager(&hal, out.path())
            .save_logs(Some(&Cluster::new("prod-eks-a-cluster")))
            .unwrap();
        let args = &hal.invocations("kubectl")[0];
        assert_eq!(args[..2], ["cluster-info", "dump"]);
        assert!(args[4].ends_with("logs/prod-eks-a-cluster"));
    }
}
