//! Recording fakes for every collaborator interface.
//!
//! All fakes of one [`Fakes`] bundle share a [`Recorder`]. Each call is recorded as
//! `"operation"` or `"operation@cluster"` and can be made to fail by registering either key.

use crate::context::Collaborators;
use crate::create::Create;
use crate::interfaces::{AddonManager, Bootstrapper, ClusterManager, Provider};
use crate::validations::Validation;
use anyhow::{bail, Result};
use capstan_core::cluster::{Manifests, NodeGroup, Ref, VersionsBundle};
use capstan_core::executables::BootstrapClusterOption;
use capstan_core::filewriter::FileWriter;
use capstan_core::{Cluster, ClusterSpec, DatacenterConfig, MachineConfig};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<String>,
    failures: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` (`"op"` or `"op@cluster"`) fail with `message` from now on.
    pub fn fail(&self, key: &str, message: &str) {
        lock(&self.state)
            .failures
            .insert(key.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// True when `call` was recorded verbatim, or as `call@<cluster>`.
    pub fn called(&self, call: &str) -> bool {
        let prefix = format!("{call}@");
        lock(&self.state)
            .calls
            .iter()
            .any(|c| c == call || c.starts_with(&prefix))
    }

    pub fn count(&self, call: &str) -> usize {
        lock(&self.state).calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        lock(&self.state).calls.clear();
    }

    fn record(&self, op: &str, cluster: Option<&str>) -> Result<()> {
        let call = match cluster {
            Some(name) => format!("{op}@{name}"),
            None => op.to_string(),
        };
        let mut state = lock(&self.state);
        state.calls.push(call.clone());
        let failure = state
            .failures
            .get(&call)
            .or_else(|| state.failures.get(op))
            .cloned();
        drop(state);
        match failure {
            Some(message) => bail!(message),
            None => Ok(()),
        }
    }
}

/// Small valid spec for a docker-backed cluster.
pub fn spec(name: &str) -> ClusterSpec {
    ClusterSpec {
        name: name.to_string(),
        kubernetes_version: "1.21".to_string(),
        control_plane: NodeGroup {
            count: 1,
            machine_config: None,
        },
        workers: NodeGroup {
            count: 1,
            machine_config: None,
        },
        datacenter_ref: Ref {
            kind: "DockerDatacenterConfig".to_string(),
            name: name.to_string(),
        },
        external_etcd: None,
        gitops: None,
        bundle: VersionsBundle {
            cluster_api: "v0.3.19".to_string(),
            bootstrap: "v0.3.19".to_string(),
            control_plane: "v0.3.19".to_string(),
            infrastructure: "v0.3.19".to_string(),
            etcdadm_bootstrap: None,
            etcdadm_controller: None,
        },
        manifests: Manifests {
            workload: PathBuf::from("workload.yaml"),
            networking: PathBuf::from("cilium.yaml"),
            storage_class: None,
            machine_health_checks: None,
            custom_components: PathBuf::from("eksa-components.yaml"),
        },
        annotations: BTreeMap::new(),
    }
}

fn kubeconfig(name: &str) -> PathBuf {
    PathBuf::from(format!("/fake/{name}.kubeconfig"))
}

#[derive(Debug, Clone)]
pub struct FakeProvider {
    name: String,
    recorder: Recorder,
}

impl FakeProvider {
    pub fn new(name: &str, recorder: Recorder) -> Self {
        Self {
            name: name.to_string(),
            recorder,
        }
    }
}

impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn bootstrap_cluster_options(&self) -> Result<Vec<BootstrapClusterOption>> {
        self.recorder.record("bootstrap_cluster_options", None)?;
        Ok(vec![BootstrapClusterOption::DisableDefaultCni])
    }

    fn bootstrap_setup(&self, _spec: &ClusterSpec, bootstrap: &Cluster) -> Result<()> {
        self.recorder.record("bootstrap_setup", Some(&bootstrap.name))
    }

    fn setup_and_validate_create_cluster(&self, spec: &ClusterSpec) -> Result<()> {
        self.recorder
            .record("setup_and_validate_create_cluster", Some(&spec.name))
    }

    fn datacenter_config(&self) -> DatacenterConfig {
        DatacenterConfig::new("DockerDatacenterConfig", "fake-dc", Default::default())
    }

    fn machine_configs(&self) -> Vec<MachineConfig> {
        Vec::new()
    }
}

#[derive(Debug, Clone)]
pub struct FakeBootstrapper {
    recorder: Recorder,
}

impl FakeBootstrapper {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl Bootstrapper for FakeBootstrapper {
    fn create_bootstrap_cluster(
        &self,
        spec: &ClusterSpec,
        _options: &[BootstrapClusterOption],
    ) -> Result<Cluster> {
        let name = spec.bootstrap_cluster_name();
        self.recorder.record("create_bootstrap_cluster", Some(&name))?;
        Ok(Cluster::new(name.clone()).with_kubeconfig(kubeconfig(&name)))
    }

    fn delete_bootstrap_cluster(&self, cluster: &Cluster, _force: bool) -> Result<()> {
        self.recorder
            .record("delete_bootstrap_cluster", Some(&cluster.name))
    }
}

#[derive(Debug, Clone)]
pub struct FakeClusterManager {
    recorder: Recorder,
    created_paused: Arc<Mutex<Option<bool>>>,
}

impl FakeClusterManager {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            created_paused: Arc::default(),
        }
    }

    /// Whether cluster and datacenter were both paused when resources were created.
    pub fn created_paused(&self) -> Option<bool> {
        *lock(&self.created_paused)
    }
}

impl ClusterManager for FakeClusterManager {
    fn install_capi(&self, _spec: &ClusterSpec, cluster: &Cluster, _provider: &dyn Provider) -> Result<()> {
        self.recorder.record("install_capi", Some(&cluster.name))
    }

    fn create_workload_cluster(
        &self,
        _bootstrap: &Cluster,
        spec: &ClusterSpec,
        _provider: &dyn Provider,
    ) -> Result<Cluster> {
        self.recorder
            .record("create_workload_cluster", Some(&spec.name))?;
        Ok(Cluster::new(spec.name.clone()).with_kubeconfig(kubeconfig(&spec.name)))
    }

    fn install_networking(&self, cluster: &Cluster, _spec: &ClusterSpec) -> Result<()> {
        self.recorder.record("install_networking", Some(&cluster.name))
    }

    fn install_storage_class(&self, cluster: &Cluster, _spec: &ClusterSpec, _provider: &dyn Provider) -> Result<()> {
        self.recorder
            .record("install_storage_class", Some(&cluster.name))
    }

    fn install_machine_health_checks(
        &self,
        bootstrap: &Cluster,
        _spec: &ClusterSpec,
        _provider: &dyn Provider,
    ) -> Result<()> {
        self.recorder
            .record("install_machine_health_checks", Some(&bootstrap.name))
    }

    fn move_capi(&self, _from: &Cluster, to: &Cluster) -> Result<()> {
        self.recorder.record("move_capi", Some(&to.name))
    }

    fn install_custom_components(&self, _spec: &ClusterSpec, cluster: &Cluster) -> Result<()> {
        self.recorder
            .record("install_custom_components", Some(&cluster.name))
    }

    fn create_eksa_resources(
        &self,
        cluster: &Cluster,
        spec: &ClusterSpec,
        datacenter: &DatacenterConfig,
        _machines: &[MachineConfig],
    ) -> Result<()> {
        *lock(&self.created_paused) = Some(spec.is_paused() && datacenter.is_paused());
        self.recorder
            .record("create_eksa_resources", Some(&cluster.name))
    }

    fn resume_eksa_controller_reconcile(
        &self,
        cluster: &Cluster,
        _spec: &ClusterSpec,
        _provider: &dyn Provider,
    ) -> Result<()> {
        self.recorder
            .record("resume_eksa_controller_reconcile", Some(&cluster.name))
    }

    fn save_logs(&self, bootstrap: Option<&Cluster>) -> Result<()> {
        self.recorder
            .record("save_logs", bootstrap.map(|c| c.name.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct FakeAddonManager {
    recorder: Recorder,
    checks: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl FakeAddonManager {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            checks: Arc::default(),
        }
    }

    /// Add a validation named `name`; it fails with `error` when one is given.
    pub fn add_validation(&self, name: &str, error: Option<&str>) {
        lock(&self.checks).push((name.to_string(), error.map(str::to_string)));
    }
}

impl AddonManager for FakeAddonManager {
    fn install_gitops(
        &self,
        cluster: &Cluster,
        _spec: &ClusterSpec,
        _datacenter: &DatacenterConfig,
        _machines: &[MachineConfig],
    ) -> Result<()> {
        self.recorder.record("install_gitops", Some(&cluster.name))
    }

    fn validations<'a>(&'a self, _spec: &'a ClusterSpec) -> Vec<Validation<'a>> {
        lock(&self.checks)
            .iter()
            .cloned()
            .map(|(name, error)| {
                Validation::new(name, move || match error {
                    Some(message) => bail!(message),
                    None => Ok(()),
                })
            })
            .collect()
    }
}

/// In-memory `FileWriter`.
#[derive(Debug, Clone)]
pub struct FakeWriter {
    recorder: Recorder,
    dir: PathBuf,
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl FakeWriter {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            dir: PathBuf::from("/fake/out"),
            files: Arc::default(),
        }
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.files).clone()
    }
}

impl FileWriter for FakeWriter {
    fn write(&self, file_name: &str, content: &[u8]) -> Result<PathBuf> {
        self.recorder.record("write", Some(file_name))?;
        lock(&self.files).push((file_name.to_string(), content.to_vec()));
        Ok(self.dir.join(file_name))
    }

    fn dir(&self) -> &Path {
        &self.dir
    }
}

/// One fake of each collaborator, sharing a recorder.
#[derive(Debug, Clone)]
pub struct Fakes {
    pub recorder: Recorder,
    pub provider: FakeProvider,
    pub bootstrapper: FakeBootstrapper,
    pub cluster_manager: FakeClusterManager,
    pub addon_manager: FakeAddonManager,
    pub writer: FakeWriter,
}

impl Fakes {
    pub fn new() -> Self {
        let recorder = Recorder::new();
        Self {
            provider: FakeProvider::new("docker", recorder.clone()),
            bootstrapper: FakeBootstrapper::new(recorder.clone()),
            cluster_manager: FakeClusterManager::new(recorder.clone()),
            addon_manager: FakeAddonManager::new(recorder.clone()),
            writer: FakeWriter::new(recorder.clone()),
            recorder,
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            bootstrapper: &self.bootstrapper,
            provider: &self.provider,
            cluster_manager: &self.cluster_manager,
            addon_manager: &self.addon_manager,
            writer: &self.writer,
        }
    }

    pub fn create(&self) -> Create<'_> {
        Create::from_collaborators(self.collaborators())
    }
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new()
    }
}
