/*
 * Registry Module
 *
 * The surface registry is the authority on which windows take part and
 * where they are. The simulation only consumes it through the
 * SurfaceRegistry trait: it polls the registry once per frame and receives
 * notices, which it queues and applies at the start of its next tick.
 *
 * Two implementations are provided:
 * - MemoryRegistry: a scriptable in-process registry
 * - SharedFileRegistry: windows of separate processes share a small JSON
 *   document on disk. Each process appends a record for its window, keeps
 *   its rectangle and heartbeat up to date, and removes the record when it
 *   leaves. Records of processes that stopped heartbeating are pruned.
 *   Every read-modify-write of the document happens under a lock file.
 */

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use nannou::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::surface::{Surface, SurfaceId, SurfaceRect};

// Opaque key/value data attached to a surface at registration
pub type Metadata = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegistryNotice {
    // The local surface moved or was resized; carries its desktop position
    ShapeChanged { position: Vec2 },
    // A surface joined or left
    SetChanged,
}

pub trait SurfaceRegistry {
    // Register this process's surface
    fn init(&mut self, metadata: Metadata, local_rect: SurfaceRect) -> Result<SurfaceId, RegistryError>;

    // Publish the local rectangle and pick up changes from other surfaces
    fn update(&mut self, local_rect: SurfaceRect) -> Result<Vec<RegistryNotice>, RegistryError>;

    // Snapshot of all live surfaces in registry order
    fn surfaces(&self) -> &[Surface];

    fn local_id(&self) -> Option<SurfaceId>;

    fn leave(&mut self) -> Result<(), RegistryError>;
}

fn ids_of(surfaces: &[Surface]) -> Vec<SurfaceId> {
    surfaces.iter().map(|s| s.id).collect()
}

// In-process registry. Other surfaces are added and moved by hand.
#[derive(Default)]
pub struct MemoryRegistry {
    surfaces: Vec<Surface>,
    metadata: BTreeMap<SurfaceId, Metadata>,
    next_id: u64,
    local: Option<SurfaceId>,
    known_ids: Vec<SurfaceId>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rect: SurfaceRect) -> SurfaceId {
        self.next_id += 1;
        let id = SurfaceId(self.next_id);
        self.surfaces.push(Surface::new(id, rect));
        id
    }

    pub fn remove(&mut self, id: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| s.id != id);
        self.metadata.remove(&id);
        self.surfaces.len() != before
    }

    pub fn set_rect(&mut self, id: SurfaceId, rect: SurfaceRect) -> bool {
        match self.surfaces.iter_mut().find(|s| s.id == id) {
            Some(surface) => {
                surface.rect = rect;
                true
            }
            None => false,
        }
    }

    pub fn metadata(&self, id: SurfaceId) -> Option<&Metadata> {
        self.metadata.get(&id)
    }
}

impl SurfaceRegistry for MemoryRegistry {
    fn init(&mut self, metadata: Metadata, local_rect: SurfaceRect) -> Result<SurfaceId, RegistryError> {
        let id = self.insert(local_rect);
        self.metadata.insert(id, metadata);
        self.local = Some(id);
        self.known_ids = ids_of(&self.surfaces);
        Ok(id)
    }

    fn update(&mut self, local_rect: SurfaceRect) -> Result<Vec<RegistryNotice>, RegistryError> {
        let local = self.local.ok_or(RegistryError::NotInitialized)?;
        let mut notices = Vec::new();

        if let Some(surface) = self.surfaces.iter_mut().find(|s| s.id == local) {
            if surface.rect != local_rect {
                surface.rect = local_rect;
                notices.push(RegistryNotice::ShapeChanged {
                    position: local_rect.position(),
                });
            }
        }

        let ids = ids_of(&self.surfaces);
        if ids != self.known_ids {
            self.known_ids = ids;
            notices.push(RegistryNotice::SetChanged);
        }
        Ok(notices)
    }

    fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    fn local_id(&self) -> Option<SurfaceId> {
        self.local
    }

    fn leave(&mut self) -> Result<(), RegistryError> {
        if let Some(id) = self.local.take() {
            self.remove(id);
        }
        Ok(())
    }
}

// On-disk layout of the shared store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    count: u64,
    surfaces: Vec<SurfaceRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SurfaceRecord {
    id: SurfaceId,
    // Token of the registry that wrote the record; ids alone can repeat
    // after the store was cleared
    #[serde(default)]
    owner: String,
    rect: SurfaceRect,
    #[serde(default)]
    metadata: Metadata,
    // Unix time in milliseconds of the owner's last sign of life
    heartbeat: i64,
}

const HEARTBEAT_INTERVAL_MS: i64 = 1000;
const LOCK_RETRY: Duration = Duration::from_millis(2);
const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

// Exclusive access to the store across processes. Held around every
// read-modify-write; the lock file is removed on drop.
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(store: &Path) -> Result<Self, RegistryError> {
        let path = sibling(store, ".lock");
        let mut deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        // The holder exited without releasing it
                        warn!("breaking stale lock {}", path.display());
                        remove_if_present(&path)?;
                        deadline = Instant::now() + LOCK_TIMEOUT;
                        continue;
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("could not release lock {}: {}", self.path.display(), e);
        }
    }
}

pub struct SharedFileRegistry {
    path: PathBuf,
    owner: String,
    stale_after: Duration,
    local: Option<SurfaceId>,
    local_rect: SurfaceRect,
    metadata: Metadata,
    last_heartbeat: i64,
    surfaces: Vec<Surface>,
    known_ids: Vec<SurfaceId>,
}

impl SharedFileRegistry {
    // Open the store at `path`, failing if it exists but cannot be read
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let document = read_document(&path)?;
        debug!(
            "opened surface store {} ({} records)",
            path.display(),
            document.surfaces.len()
        );

        Ok(Self {
            path,
            owner: format!("{}-{:016x}", std::process::id(), rand::random::<u64>()),
            stale_after: Duration::from_secs(5),
            local: None,
            local_rect: SurfaceRect::default(),
            metadata: Metadata::new(),
            last_heartbeat: 0,
            surfaces: Vec::new(),
            known_ids: Vec::new(),
        })
    }

    // How long a record may go without a heartbeat before other surfaces
    // drop it
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Wipe the store so the next window starts counting from 1
    pub fn clear(path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let _lock = StoreLock::acquire(path.as_ref())?;
        remove_if_present(path.as_ref())
    }

    fn local_record(&self, id: SurfaceId, now: i64) -> SurfaceRecord {
        SurfaceRecord {
            id,
            owner: self.owner.clone(),
            rect: self.local_rect,
            metadata: self.metadata.clone(),
            heartbeat: now,
        }
    }

    fn is_own(&self, record: &SurfaceRecord) -> bool {
        Some(record.id) == self.local && record.owner == self.owner
    }

    // Drop records whose owner stopped heartbeating; our own record stays
    fn prune_stale(&self, document: &mut StoreDocument, now: i64) -> usize {
        let limit = self.stale_after.as_millis() as i64;
        let before = document.surfaces.len();
        document
            .surfaces
            .retain(|r| self.is_own(r) || now - r.heartbeat <= limit);
        before - document.surfaces.len()
    }

    fn refresh(&mut self, document: &StoreDocument) -> bool {
        self.surfaces = document
            .surfaces
            .iter()
            .map(|r| Surface::new(r.id, r.rect))
            .collect();
        let ids = ids_of(&self.surfaces);
        let changed = ids != self.known_ids;
        self.known_ids = ids;
        changed
    }

    fn write(&self, document: &StoreDocument) -> Result<(), RegistryError> {
        write_document(&self.path, document)
    }
}

impl SurfaceRegistry for SharedFileRegistry {
    fn init(&mut self, metadata: Metadata, local_rect: SurfaceRect) -> Result<SurfaceId, RegistryError> {
        let _lock = StoreLock::acquire(&self.path)?;
        let now = now_millis();
        let mut document = read_document(&self.path)?;
        self.prune_stale(&mut document, now);

        document.count += 1;
        let id = SurfaceId(document.count);
        self.local = Some(id);
        self.local_rect = local_rect;
        self.metadata = metadata;
        self.last_heartbeat = now;

        document.surfaces.push(self.local_record(id, now));
        self.write(&document)?;
        self.refresh(&document);

        info!(
            "joined surface store {} as {} ({} surfaces)",
            self.path.display(),
            id,
            self.surfaces.len()
        );
        Ok(id)
    }

    fn update(&mut self, local_rect: SurfaceRect) -> Result<Vec<RegistryNotice>, RegistryError> {
        let local = self.local.ok_or(RegistryError::NotInitialized)?;
        let _lock = StoreLock::acquire(&self.path)?;
        let now = now_millis();
        let mut notices = Vec::new();

        let mut document = read_document(&self.path)?;
        let pruned = self.prune_stale(&mut document, now);
        if pruned > 0 {
            debug!("pruned {} stale surface records", pruned);
        }
        let mut dirty = pruned > 0;

        if local_rect != self.local_rect {
            self.local_rect = local_rect;
            notices.push(RegistryNotice::ShapeChanged {
                position: local_rect.position(),
            });
        }

        let heartbeat_due = now - self.last_heartbeat >= HEARTBEAT_INTERVAL_MS;
        let own = document.surfaces.iter().position(|r| self.is_own(r));
        match own {
            Some(index) => {
                let record = &mut document.surfaces[index];
                if record.rect != self.local_rect {
                    record.rect = self.local_rect;
                    dirty = true;
                }
                if heartbeat_due {
                    record.heartbeat = now;
                    dirty = true;
                }
            }
            None => {
                // Pruned or cleared by someone else. The old id may already
                // belong to a newer surface, so take a fresh one.
                let id = SurfaceId(document.count.max(local.0) + 1);
                warn!("surface {} missing from shared store, re-registering as {}", local, id);
                document.count = id.0;
                self.local = Some(id);
                document.surfaces.push(self.local_record(id, now));
                dirty = true;
            }
        }

        if dirty {
            self.write(&document)?;
            if heartbeat_due {
                self.last_heartbeat = now;
            }
        }

        if self.refresh(&document) {
            notices.push(RegistryNotice::SetChanged);
        }
        Ok(notices)
    }

    fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    fn local_id(&self) -> Option<SurfaceId> {
        self.local
    }

    fn leave(&mut self) -> Result<(), RegistryError> {
        if self.local.is_none() {
            return Ok(());
        }
        let _lock = StoreLock::acquire(&self.path)?;
        let mut document = read_document(&self.path)?;
        document.surfaces.retain(|r| !self.is_own(r));
        self.write(&document)?;
        if let Some(id) = self.local.take() {
            info!("left surface store as {}", id);
        }
        Ok(())
    }
}

impl Drop for SharedFileRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.leave() {
            warn!("could not remove surface from shared store: {}", e);
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// `<store><suffix>` in the same directory
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> Result<(), RegistryError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn read_document(path: &Path) -> Result<StoreDocument, RegistryError> {
    match fs::read_to_string(path) {
        Ok(json) if json.trim().is_empty() => Ok(StoreDocument::default()),
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreDocument::default()),
        Err(e) => Err(e.into()),
    }
}

// Write next to the store and rename over it, so readers never see a
// half-written document
fn write_document(path: &Path, document: &StoreDocument) -> Result<(), RegistryError> {
    let json = serde_json::to_string(document)?;
    let tmp = sibling(path, &format!(".{}.tmp", std::process::id()));

    let written = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        if let Err(cleanup) = remove_if_present(&tmp) {
            debug!("could not remove {}: {}", tmp.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32) -> SurfaceRect {
        SurfaceRect::new(x, 20.0, 640.0, 480.0)
    }

    #[test]
    fn memory_registry_reports_shape_and_set_changes() {
        let mut registry = MemoryRegistry::new();
        assert!(matches!(
            registry.update(rect(0.0)),
            Err(RegistryError::NotInitialized)
        ));

        let mut meta = Metadata::new();
        meta.insert("foo".into(), "bar".into());
        let local = registry.init(meta, rect(0.0)).unwrap();
        assert_eq!(registry.metadata(local).unwrap()["foo"], "bar");
        assert!(registry.update(rect(0.0)).unwrap().is_empty());

        let other = registry.insert(rect(700.0));
        assert_eq!(registry.update(rect(0.0)).unwrap(), vec![RegistryNotice::SetChanged]);

        assert_eq!(
            registry.update(rect(50.0)).unwrap(),
            vec![RegistryNotice::ShapeChanged { position: vec2(50.0, 20.0) }]
        );

        // Moving another surface is picked up through surfaces(), not notices
        registry.set_rect(other, rect(900.0));
        assert!(registry.update(rect(50.0)).unwrap().is_empty());
        assert_eq!(registry.surfaces()[1].rect.x, 900.0);

        registry.remove(other);
        assert_eq!(registry.update(rect(50.0)).unwrap(), vec![RegistryNotice::SetChanged]);
    }

    #[test]
    fn two_processes_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");

        let mut a = SharedFileRegistry::open(&path).unwrap();
        let mut b = SharedFileRegistry::open(&path).unwrap();

        let id_a = a.init(Metadata::new(), rect(0.0)).unwrap();
        let id_b = b.init(Metadata::new(), rect(700.0)).unwrap();
        assert_eq!(id_a, SurfaceId(1));
        assert_eq!(id_b, SurfaceId(2));

        let notices = a.update(rect(0.0)).unwrap();
        assert_eq!(notices, vec![RegistryNotice::SetChanged]);
        let ids: Vec<_> = a.surfaces().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![id_a, id_b]);
        assert_eq!(a.surfaces()[1].rect, rect(700.0));

        b.update(rect(720.0)).unwrap();
        assert!(a.update(rect(0.0)).unwrap().is_empty());
        assert_eq!(a.surfaces()[1].rect.x, 720.0);

        b.leave().unwrap();
        assert_eq!(a.update(rect(0.0)).unwrap(), vec![RegistryNotice::SetChanged]);
        assert_eq!(a.surfaces().len(), 1);
    }

    #[test]
    fn local_move_is_published() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        let mut a = SharedFileRegistry::open(&path).unwrap();
        a.init(Metadata::new(), rect(0.0)).unwrap();

        let notices = a.update(rect(33.0)).unwrap();
        assert_eq!(
            notices,
            vec![RegistryNotice::ShapeChanged { position: vec2(33.0, 20.0) }]
        );

        let mut reader = SharedFileRegistry::open(&path).unwrap();
        reader.init(Metadata::new(), rect(1000.0)).unwrap();
        assert_eq!(reader.surfaces()[0].rect.x, 33.0);
    }

    #[test]
    fn dropping_a_registry_removes_its_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");

        let mut a = SharedFileRegistry::open(&path).unwrap();
        a.init(Metadata::new(), rect(0.0)).unwrap();
        {
            let mut b = SharedFileRegistry::open(&path).unwrap();
            b.init(Metadata::new(), rect(100.0)).unwrap();
        }
        a.update(rect(0.0)).unwrap();
        assert_eq!(a.surfaces().len(), 1);
    }

    #[test]
    fn stale_records_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        let abandoned = r#"{"count":4,"surfaces":[{"id":4,"rect":{"x":0,"y":0,"width":10,"height":10},"heartbeat":0}]}"#;
        fs::write(&path, abandoned).unwrap();

        let mut a = SharedFileRegistry::open(&path).unwrap();
        let id = a.init(Metadata::new(), rect(0.0)).unwrap();
        assert_eq!(id, SurfaceId(5));
        assert_eq!(a.surfaces().len(), 1);
        assert_eq!(a.surfaces()[0].id, id);
    }

    #[test]
    fn missing_record_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        let mut a = SharedFileRegistry::open(&path).unwrap();
        let id = a.init(Metadata::new(), rect(0.0)).unwrap();

        SharedFileRegistry::clear(&path).unwrap();
        assert!(!path.exists());

        a.update(rect(0.0)).unwrap();
        assert_eq!(a.surfaces().len(), 1);
        assert_ne!(a.local_id(), Some(id));
        assert_eq!(a.surfaces()[0].id, a.local_id().unwrap());
    }

    #[test]
    fn cleared_store_never_shares_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        let mut a = SharedFileRegistry::open(&path).unwrap();
        let id_a = a.init(Metadata::new(), rect(0.0)).unwrap();

        // A window started after the wipe counts from 1 again
        SharedFileRegistry::clear(&path).unwrap();
        let mut b = SharedFileRegistry::open(&path).unwrap();
        let id_b = b.init(Metadata::new(), rect(700.0)).unwrap();
        assert_eq!(id_a, id_b);

        a.update(rect(0.0)).unwrap();
        let id_a = a.local_id().unwrap();
        assert_ne!(id_a, id_b);

        b.update(rect(700.0)).unwrap();
        let ids: Vec<_> = b.surfaces().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![id_b, id_a]);
        assert_eq!(b.surfaces()[0].rect, rect(700.0));
        assert_eq!(b.surfaces()[1].rect, rect(0.0));

        b.leave().unwrap();
        a.update(rect(0.0)).unwrap();
        assert_eq!(a.surfaces().len(), 1);
        assert_eq!(a.surfaces()[0].id, id_a);
    }

    #[test]
    fn concurrent_joins_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut registry = SharedFileRegistry::open(&path).unwrap();
                    let id = registry.init(Metadata::new(), rect(i as f32 * 100.0)).unwrap();
                    (id, registry)
                })
            })
            .collect();
        let joined: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut ids: Vec<_> = joined.iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);

        let document = read_document(&path).unwrap();
        assert_eq!(document.count, 8);
        assert_eq!(document.surfaces.len(), 8);
        assert!(!sibling(&path, ".lock").exists());
    }

    #[test]
    fn abandoned_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        fs::write(sibling(&path, ".lock"), "").unwrap();

        let mut a = SharedFileRegistry::open(&path).unwrap();
        assert_eq!(a.init(Metadata::new(), rect(0.0)).unwrap(), SurfaceId(1));
        assert!(!sibling(&path, ".lock").exists());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("surfaces.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "").unwrap();

        let result = write_document(&path, &StoreDocument::default());
        assert!(matches!(result, Err(RegistryError::Io(_))));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "left behind {:?}", leftovers);
    }

    #[test]
    fn corrupt_store_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surfaces.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SharedFileRegistry::open(&path),
            Err(RegistryError::Json(_))
        ));
        SharedFileRegistry::clear(&path).unwrap();
        SharedFileRegistry::clear(&path).unwrap();
    }
}
