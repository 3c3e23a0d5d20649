//! In-memory task catalog
//!
//! Records live in id-keyed maps; relations are plain id-pair sets. Nothing is
//! persisted: [`TaskCatalog::dispose`] drops every record and resets ids.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::CatalogError;
use crate::interchange::{self, LibraryRecord, Locations, ReferenceRecord, ResourceRecord, TaskRecord};
use crate::model::{
    normalize_location, EmbeddedResource, LibraryId, Platform, ReferenceAssembly, ReferenceId,
    ResourceId, SourceLibrary, TargetVersion, TaskId, TaskTemplate,
};

/// Registry of tasks, reference assemblies, embedded resources and libraries
#[derive(Debug, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<TaskId, TaskTemplate>,
    references: BTreeMap<ReferenceId, ReferenceAssembly>,
    resources: BTreeMap<ResourceId, EmbeddedResource>,
    libraries: BTreeMap<LibraryId, SourceLibrary>,

    task_libraries: BTreeSet<(TaskId, LibraryId)>,
    task_references: BTreeSet<(TaskId, ReferenceId)>,
    task_resources: BTreeSet<(TaskId, ResourceId)>,
    library_references: BTreeSet<(LibraryId, ReferenceId)>,
    library_resources: BTreeSet<(LibraryId, ResourceId)>,

    next_id: u64,
}

impl TaskCatalog {
    /// Create an empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every record and association and restart id allocation
    pub fn dispose(&mut self) {
        info!(tasks = self.tasks.len(), "Disposing task catalog");
        *self = Self::default();
    }

    /// Number of tasks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the catalog holds no tasks
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Parse a YAML payload and ingest every task it holds.
    ///
    /// # Errors
    /// Fails on invalid YAML, duplicate names within the payload, or a task
    /// without compatible versions. Nothing is ingested when validation fails.
    pub fn ingest_yaml(&mut self, yaml: &str) -> Result<Vec<TaskId>, CatalogError> {
        let records = interchange::parse_payload(yaml)?;
        self.ingest(records)
    }

    /// Ingest task records, replacing tasks of the same name.
    ///
    /// # Errors
    /// See [`TaskCatalog::ingest_yaml`].
    pub fn ingest(&mut self, records: Vec<TaskRecord>) -> Result<Vec<TaskId>, CatalogError> {
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.name.as_str()) {
                return Err(CatalogError::DuplicateName(record.name.clone()));
            }
            if record.compatible_dot_net_versions.is_empty() {
                return Err(CatalogError::EmptyVersionList { task: record.name.clone() });
            }
        }

        let ids = records.into_iter().map(|record| self.ingest_task(record)).collect::<Vec<_>>();
        info!(count = ids.len(), total = self.tasks.len(), "Ingested task payload");
        Ok(ids)
    }

    fn ingest_task(&mut self, record: TaskRecord) -> TaskId {
        let id = match self.task_by_name(&record.name) {
            Some(existing) => {
                let id = existing.id;
                debug!(task = %record.name, %id, "Replacing existing task");
                self.detach_task(id);
                id
            }
            None => TaskId(self.allocate()),
        };

        let TaskRecord {
            name,
            aliases,
            author,
            description,
            help,
            language,
            compatible_dot_net_versions,
            code,
            tasking_type,
            unsafe_compile,
            token_task,
            options,
            reference_source_libraries,
            reference_assemblies,
            embedded_resources,
        } = record;

        self.tasks.insert(
            id,
            TaskTemplate {
                id,
                name,
                aliases,
                author,
                description,
                help,
                language,
                compatible_versions: compatible_dot_net_versions,
                code,
                tasking_type,
                unsafe_compile,
                token_task,
                options,
                obfuscate: false,
                compiled: false,
            },
        );

        for library in reference_source_libraries {
            let library_id = self.upsert_library(library);
            self.task_libraries.insert((id, library_id));
        }
        for reference in reference_assemblies {
            let reference_id = self.upsert_reference(&reference);
            self.task_references.insert((id, reference_id));
        }
        for resource in embedded_resources {
            let resource_id = self.upsert_resource(&resource);
            self.task_resources.insert((id, resource_id));
        }
        id
    }

    fn detach_task(&mut self, id: TaskId) {
        self.task_libraries.retain(|(task, _)| *task != id);
        self.task_references.retain(|(task, _)| *task != id);
        self.task_resources.retain(|(task, _)| *task != id);
    }

    fn upsert_library(&mut self, record: LibraryRecord) -> LibraryId {
        let locations = record.location.into_vec().iter().map(|l| normalize_location(l)).collect();
        let id = match self.libraries.values().find(|l| l.name == record.name) {
            Some(existing) => existing.id,
            None => LibraryId(self.allocate()),
        };
        self.libraries.insert(
            id,
            SourceLibrary {
                id,
                name: record.name,
                description: record.description,
                locations,
                language: record.language,
                compatible_versions: record.compatible_dot_net_versions,
            },
        );

        self.library_references.retain(|(library, _)| *library != id);
        self.library_resources.retain(|(library, _)| *library != id);
        for reference in &record.reference_assemblies {
            let reference_id = self.upsert_reference(reference);
            self.library_references.insert((id, reference_id));
        }
        for resource in &record.embedded_resources {
            let resource_id = self.upsert_resource(resource);
            self.library_resources.insert((id, resource_id));
        }
        id
    }

    fn upsert_reference(&mut self, record: &ReferenceRecord) -> ReferenceId {
        let location = normalize_location(&record.location);
        if let Some(existing) = self
            .references
            .values_mut()
            .find(|r| r.name == record.name && r.version == record.dot_net_version)
        {
            existing.location = location;
            return existing.id;
        }
        let id = ReferenceId(self.allocate());
        self.references.insert(
            id,
            ReferenceAssembly {
                id,
                name: record.name.clone(),
                location,
                version: record.dot_net_version,
            },
        );
        id
    }

    fn upsert_resource(&mut self, record: &ResourceRecord) -> ResourceId {
        let location = normalize_location(&record.location);
        let platform = record.platform.unwrap_or_default();
        if let Some(existing) = self.resources.values_mut().find(|r| r.name == record.name) {
            existing.location = location;
            existing.platform = platform;
            return existing.id;
        }
        let id = ResourceId(self.allocate());
        self.resources.insert(
            id,
            EmbeddedResource {
                id,
                name: record.name.clone(),
                location,
                platform,
            },
        );
        id
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Task by id
    #[inline]
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&TaskTemplate> {
        self.tasks.get(&id)
    }

    /// Task by id, erroring on a stale id
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownTask`] if the id is not present.
    pub fn require_task(&self, id: TaskId) -> Result<&TaskTemplate, CatalogError> {
        self.tasks.get(&id).ok_or(CatalogError::UnknownTask(id))
    }

    /// Task by exact, case-sensitive name
    #[must_use]
    pub fn task_by_name(&self, name: &str) -> Option<&TaskTemplate> {
        self.tasks.values().find(|t| t.name == name)
    }

    /// Case-insensitive name match among tasks supporting `version`, falling
    /// back to aliases.
    #[must_use]
    pub fn find_task(&self, name: &str, version: TargetVersion) -> Option<&TaskTemplate> {
        let compatible = || self.tasks.values().filter(move |t| t.supports(version));
        compatible()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .or_else(|| compatible().find(|t| t.answers_to(name)))
    }

    /// All tasks in id order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskTemplate> {
        self.tasks.values()
    }

    /// All reference assemblies
    pub fn references(&self) -> impl Iterator<Item = &ReferenceAssembly> {
        self.references.values()
    }

    /// All embedded resources
    pub fn resources(&self) -> impl Iterator<Item = &EmbeddedResource> {
        self.resources.values()
    }

    /// All source libraries
    pub fn libraries(&self) -> impl Iterator<Item = &SourceLibrary> {
        self.libraries.values()
    }

    /// Libraries attached to a task
    #[must_use]
    pub fn task_libraries(&self, id: TaskId) -> Vec<&SourceLibrary> {
        self.task_libraries
            .range((id, LibraryId(0))..=(id, LibraryId(u64::MAX)))
            .filter_map(|(_, library)| self.libraries.get(library))
            .collect()
    }

    /// Reference assemblies attached directly to a task
    #[must_use]
    pub fn task_references(&self, id: TaskId) -> Vec<&ReferenceAssembly> {
        self.task_references
            .range((id, ReferenceId(0))..=(id, ReferenceId(u64::MAX)))
            .filter_map(|(_, reference)| self.references.get(reference))
            .collect()
    }

    /// Embedded resources attached directly to a task
    #[must_use]
    pub fn task_resources(&self, id: TaskId) -> Vec<&EmbeddedResource> {
        self.task_resources
            .range((id, ResourceId(0))..=(id, ResourceId(u64::MAX)))
            .filter_map(|(_, resource)| self.resources.get(resource))
            .collect()
    }

    /// Reference assemblies attached to a library
    #[must_use]
    pub fn library_references(&self, id: LibraryId) -> Vec<&ReferenceAssembly> {
        self.library_references
            .range((id, ReferenceId(0))..=(id, ReferenceId(u64::MAX)))
            .filter_map(|(_, reference)| self.references.get(reference))
            .collect()
    }

    /// Embedded resources attached to a library
    #[must_use]
    pub fn library_resources(&self, id: LibraryId) -> Vec<&EmbeddedResource> {
        self.library_resources
            .range((id, ResourceId(0))..=(id, ResourceId(u64::MAX)))
            .filter_map(|(_, resource)| self.resources.get(resource))
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Rename a task
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownTask`] for a stale id.
    pub fn rename_task(&mut self, id: TaskId, name: impl Into<String>) -> Result<(), CatalogError> {
        let task = self.tasks.get_mut(&id).ok_or(CatalogError::UnknownTask(id))?;
        task.name = name.into();
        Ok(())
    }

    /// Set the obfuscate flag
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownTask`] for a stale id.
    pub fn set_obfuscate(&mut self, id: TaskId, obfuscate: bool) -> Result<(), CatalogError> {
        let task = self.tasks.get_mut(&id).ok_or(CatalogError::UnknownTask(id))?;
        task.obfuscate = obfuscate;
        Ok(())
    }

    /// Mark a task as compiled
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownTask`] for a stale id.
    pub fn mark_compiled(&mut self, id: TaskId) -> Result<(), CatalogError> {
        let task = self.tasks.get_mut(&id).ok_or(CatalogError::UnknownTask(id))?;
        task.compiled = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Interchange record for one task
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownTask`] for a stale id.
    pub fn export_task(&self, id: TaskId) -> Result<TaskRecord, CatalogError> {
        let task = self.require_task(id)?;
        Ok(TaskRecord {
            name: task.name.clone(),
            aliases: task.aliases.clone(),
            author: task.author.clone(),
            description: task.description.clone(),
            help: task.help.clone(),
            language: task.language,
            compatible_dot_net_versions: task.compatible_versions.clone(),
            code: task.code.clone(),
            tasking_type: task.tasking_type.clone(),
            unsafe_compile: task.unsafe_compile,
            token_task: task.token_task,
            options: task.options.clone(),
            reference_source_libraries: self
                .task_libraries(id)
                .into_iter()
                .map(|library| self.export_library(library))
                .collect(),
            reference_assemblies: self.task_references(id).into_iter().map(export_reference).collect(),
            embedded_resources: self.task_resources(id).into_iter().map(export_resource).collect(),
        })
    }

    fn export_library(&self, library: &SourceLibrary) -> LibraryRecord {
        LibraryRecord {
            name: library.name.clone(),
            description: library.description.clone(),
            location: Locations::from_vec(library.locations.iter().map(|l| normalize_location(l)).collect()),
            language: library.language,
            compatible_dot_net_versions: library.compatible_versions.clone(),
            reference_assemblies: self.library_references(library.id).into_iter().map(export_reference).collect(),
            embedded_resources: self.library_resources(library.id).into_iter().map(export_resource).collect(),
        }
    }

    /// YAML for the given tasks
    ///
    /// # Errors
    /// Fails on a stale id or a serialization error.
    pub fn export_yaml(&self, ids: &[TaskId]) -> Result<String, CatalogError> {
        let records = ids.iter().map(|id| self.export_task(*id)).collect::<Result<Vec<_>, _>>()?;
        interchange::render_payload(&records)
    }

    /// YAML for every task
    ///
    /// # Errors
    /// Returns [`CatalogError::Yaml`] if serialization fails.
    pub fn export_all_yaml(&self) -> Result<String, CatalogError> {
        let ids = self.tasks.keys().copied().collect::<Vec<_>>();
        self.export_yaml(&ids)
    }
}

fn export_reference(reference: &ReferenceAssembly) -> ReferenceRecord {
    ReferenceRecord {
        name: reference.name.clone(),
        location: normalize_location(&reference.location),
        dot_net_version: reference.version,
    }
}

fn export_resource(resource: &EmbeddedResource) -> ResourceRecord {
    ResourceRecord {
        name: resource.name.clone(),
        location: normalize_location(&resource.location),
        platform: (resource.platform != Platform::AnyCpu).then_some(resource.platform),
    }
}
