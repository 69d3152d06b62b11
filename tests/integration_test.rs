//! Integration tests for mycelial.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::too_many_lines)]

use mycelial::config::SettingsService;
use mycelial::notify::MemoryNotifier;
use mycelial::observability::EventBus;
use mycelial::services::{DropTarget, apply_drop};
use mycelial::storage::{FilesystemKeyValueStore, MemoryKeyValueStore};
use mycelial::{
    BasinEditor, BasinId, BasinPatch, DragController, Error, KnowledgeBasin, KnowledgeItem,
    KnowledgeItemId, KnowledgeItemKind, KnowledgeStore, NotificationLevel, ProjectStore,
    WorkspaceEvent, WorkspaceStore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Store wrapper that records every basin patch it receives.
struct RecordingStore {
    inner: WorkspaceStore,
    patches: Mutex<Vec<(BasinId, BasinPatch)>>,
    fail_updates: AtomicBool,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: WorkspaceStore::new(Arc::new(MemoryKeyValueStore::new()))
                .with_event_bus(EventBus::new(16)),
            patches: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Makes every later `update_basin` call fail with a write error.
    fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn patches(&self) -> Vec<(BasinId, BasinPatch)> {
        self.patches.lock().unwrap().clone()
    }
}

impl KnowledgeStore for RecordingStore {
    fn items(&self) -> mycelial::Result<Vec<KnowledgeItem>> {
        self.inner.items()
    }

    fn add_item(&self, item: KnowledgeItem) -> mycelial::Result<KnowledgeItem> {
        self.inner.add_item(item)
    }

    fn update_item(&self, item: KnowledgeItem) -> mycelial::Result<KnowledgeItem> {
        self.inner.update_item(item)
    }

    fn delete_item(&self, id: &KnowledgeItemId) -> mycelial::Result<bool> {
        self.inner.delete_item(id)
    }

    fn folders(&self) -> mycelial::Result<Vec<mycelial::KnowledgeFolder>> {
        self.inner.folders()
    }

    fn create_folder(&self, name: &str) -> mycelial::Result<mycelial::KnowledgeFolder> {
        self.inner.create_folder(name)
    }

    fn rename_folder(
        &self,
        id: &mycelial::FolderId,
        name: &str,
    ) -> mycelial::Result<mycelial::KnowledgeFolder> {
        self.inner.rename_folder(id, name)
    }

    fn delete_folder(&self, id: &mycelial::FolderId) -> mycelial::Result<bool> {
        self.inner.delete_folder(id)
    }

    fn move_item_to_folder(
        &self,
        item_id: &KnowledgeItemId,
        folder_id: &mycelial::FolderId,
    ) -> mycelial::Result<KnowledgeItem> {
        self.inner.move_item_to_folder(item_id, folder_id)
    }

    fn move_item_to_basin(
        &self,
        item_id: &KnowledgeItemId,
        basin_id: &BasinId,
    ) -> mycelial::Result<KnowledgeItem> {
        self.inner.move_item_to_basin(item_id, basin_id)
    }

    fn basins(&self) -> mycelial::Result<Vec<KnowledgeBasin>> {
        self.inner.basins()
    }

    fn create_basin(&self, name: &str, description: &str) -> mycelial::Result<KnowledgeBasin> {
        self.inner.create_basin(name, description)
    }

    fn update_basin(&self, id: &BasinId, patch: BasinPatch) -> mycelial::Result<KnowledgeBasin> {
        self.patches
            .lock()
            .unwrap()
            .push((id.clone(), patch.clone()));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::operation("update_basin", "disk full"));
        }
        self.inner.update_basin(id, patch)
    }

    fn delete_basin(&self, id: &BasinId) -> mycelial::Result<bool> {
        self.inner.delete_basin(id)
    }
}

/// Seeds basin `b1` "Research" holding items A and B.
fn seed(store: &RecordingStore) -> (KnowledgeBasin, KnowledgeItem, KnowledgeItem) {
    let a = store
        .add_item(KnowledgeItem::new("A", KnowledgeItemKind::Text).with_id("A"))
        .expect("add A");
    let b = store
        .add_item(KnowledgeItem::new("B", KnowledgeItemKind::Link).with_id("B"))
        .expect("add B");
    let basin = store.create_basin("Research", "papers").expect("basin");
    store.move_item_to_basin(&a.id, &basin.id).expect("A to basin");
    store.move_item_to_basin(&b.id, &basin.id).expect("B to basin");
    let basin = store.basin(&basin.id).expect("read").expect("basin exists");
    (basin, a, b)
}

mod basin_editor_tests {
    use super::*;

    #[test]
    fn test_open_loads_basin_state() {
        let store = Arc::new(RecordingStore::new());
        let (basin, a, b) = seed(&store);
        let mut editor = BasinEditor::new(store.clone(), Arc::new(MemoryNotifier::new()));

        editor.set_open(true, Some(basin.id.clone()));

        assert_eq!(editor.name(), "Research");
        assert_eq!(editor.description(), "papers");
        assert_eq!(editor.selected_item_ids(), &[a.id, b.id]);
    }

    #[test]
    fn test_empty_name_does_not_commit() {
        let store = Arc::new(RecordingStore::new());
        let (basin, _, _) = seed(&store);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut editor = BasinEditor::new(store.clone(), notifier.clone());

        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("   ");
        let err = editor.handle_submit().expect_err("empty name");

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.patches().is_empty());
        assert!(editor.is_open());
        assert_eq!(
            notifier.last().map(|n| n.level),
            Some(NotificationLevel::Error)
        );
    }

    #[test]
    fn test_submit_commits_patch_with_remaining_items() {
        let store = Arc::new(RecordingStore::new());
        let (basin, a, b) = seed(&store);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut editor = BasinEditor::new(store.clone(), notifier.clone());

        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("Research v2");
        editor.toggle_item(&b.id);
        let updated = editor.handle_submit().expect("submit");

        let patches = store.patches();
        assert_eq!(patches.len(), 1);
        let (patched_id, patch) = &patches[0];
        assert_eq!(patched_id, &basin.id);
        assert_eq!(patch.name, "Research v2");
        assert_eq!(
            patch.items.iter().map(|i| i.id.clone()).collect::<Vec<_>>(),
            vec![a.id]
        );
        assert!(patch.updated_at > basin.updated_at);

        assert_eq!(updated.name, "Research v2");
        assert_eq!(updated.items.len(), 1);
        assert!(!editor.is_open());
        assert!(!editor.is_submitting());
        assert_eq!(
            notifier.last().map(|n| n.level),
            Some(NotificationLevel::Success)
        );
    }

    #[test]
    fn test_basin_deleted_before_submit() {
        let store = Arc::new(RecordingStore::new());
        let (basin, _, _) = seed(&store);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut editor = BasinEditor::new(store.clone(), notifier.clone());

        editor.set_open(true, Some(basin.id.clone()));
        store.delete_basin(&basin.id).expect("delete");
        let err = editor.handle_submit().expect_err("basin gone");

        assert!(matches!(err, Error::NotFound { kind: "basin", .. }));
        assert!(store.patches().is_empty());
        assert!(editor.is_open());
        assert!(!editor.is_submitting());
        let last = notifier.last().expect("notified");
        assert_eq!(last.level, NotificationLevel::Error);
        assert!(last.message.contains("not found"));
    }

    #[test]
    fn test_failed_commit_keeps_dialog_open() {
        let store = Arc::new(RecordingStore::new());
        let (basin, _, b) = seed(&store);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut editor = BasinEditor::new(store.clone(), notifier.clone());

        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("Renamed");
        editor.toggle_item(&b.id);
        store.fail_updates();
        let err = editor.handle_submit().expect_err("write fails");

        assert!(matches!(err, Error::OperationFailed { .. }));
        assert!(editor.is_open());
        assert!(!editor.is_submitting());
        assert_eq!(editor.name(), "Renamed");
        let last = notifier.last().expect("notified");
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.message, "Failed to update basin");

        let stored = store.basin(&basin.id).expect("read").expect("basin exists");
        assert_eq!(stored, basin);
    }

    #[test]
    fn test_submit_keeps_items_in_one_basin() {
        let store = Arc::new(RecordingStore::new());
        let (first, a, b) = seed(&store);
        let second = store.create_basin("Ideas", "").expect("basin");
        let mut editor = BasinEditor::new(store.clone(), Arc::new(MemoryNotifier::new()));

        // Uncheck A in the first basin.
        editor.set_open(true, Some(first.id.clone()));
        editor.toggle_item(&a.id);
        editor.handle_submit().expect("submit first");
        let a = store.item(&a.id).expect("read").expect("item");
        assert!(a.basin_id.is_none());

        // Check B, still in the first basin, in the second one.
        editor.set_open(true, Some(second.id.clone()));
        editor.set_item_selected(&b.id, true);
        let updated = editor.handle_submit().expect("submit second");
        assert_eq!(updated.item_ids(), vec![b.id.clone()]);
        assert_eq!(updated.items[0].basin_id.as_ref(), Some(&second.id));

        let b = store.item(&b.id).expect("read").expect("item");
        assert_eq!(b.basin_id.as_ref(), Some(&second.id));
        let first = store.basin(&first.id).expect("read").expect("basin exists");
        assert!(first.items.is_empty());
    }

    #[test]
    fn test_switching_basins_reloads_form() {
        let store = Arc::new(RecordingStore::new());
        let (first, _, _) = seed(&store);
        let second = store.create_basin("Ideas", "").expect("basin");
        let mut editor = BasinEditor::new(store.clone(), Arc::new(MemoryNotifier::new()));

        editor.set_open(true, Some(first.id));
        editor.set_name("unsaved");
        editor.set_open(true, Some(second.id));

        assert_eq!(editor.name(), "Ideas");
        assert!(editor.selected_item_ids().is_empty());
    }
}

mod drag_and_drop_tests {
    use super::*;

    #[test]
    fn test_drag_to_basin_then_drop() {
        let bus = EventBus::new(16);
        let store = WorkspaceStore::new(Arc::new(MemoryKeyValueStore::new()))
            .with_event_bus(bus.clone());
        let a = store
            .add_item(KnowledgeItem::new("A", KnowledgeItemKind::Text))
            .expect("add");
        let basin = store.create_basin("Research", "").expect("basin");
        let mut updates = bus.subscribe_event_type("basin_updated");

        let mut drag = DragController::with_event_bus(bus.clone());
        assert!(drag.start_dragging(Some(&a), None, &[], &[]));
        let target = DropTarget::Basin(basin.id.clone());
        assert!(drag.set_drop_target(Some(&target.to_string())));

        let (payload, drop_target) = drag.complete_drop().expect("dragging");
        assert_eq!(drop_target.as_deref(), Some(target.to_string().as_str()));
        let parsed = DropTarget::parse(drop_target.as_deref().unwrap()).expect("target");

        let outcome = apply_drop(&store, &payload, &parsed).expect("drop");
        assert_eq!(outcome.moved, vec![a.id.clone()]);

        let moved = store.item(&a.id).expect("read").expect("item");
        assert_eq!(moved.basin_id, Some(basin.id.clone()));
        assert!(moved.folder_id.is_none());

        assert!(updates.drain_matching());

        // Dropping again adds nothing.
        let outcome = apply_drop(&store, &payload, &parsed).expect("drop again");
        assert!(outcome.moved.is_empty());
        assert_eq!(outcome.skipped, vec![a.id]);
    }

    #[tokio::test]
    async fn test_drag_end_signal_resets_controller() {
        let bus = EventBus::new(16);
        let mut drag = DragController::with_event_bus(bus.clone());
        let item = KnowledgeItem::new("A", KnowledgeItemKind::Text);
        let baseline = bus.receiver_count();

        drag.start_dragging(Some(&item), None, &[], &[]);
        assert_eq!(bus.receiver_count(), baseline + 1);

        bus.publish(WorkspaceEvent::drag_ended("test"));
        assert!(drag.wait_for_drag_end().await);
        assert!(!drag.is_dragging());
        assert_eq!(bus.receiver_count(), baseline);
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn test_filesystem_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");

        let project_id = {
            let kv = Arc::new(FilesystemKeyValueStore::new(dir.path()).expect("open"));
            let store = WorkspaceStore::new(kv.clone()).with_event_bus(EventBus::new(4));
            let item = store
                .add_item(KnowledgeItem::new("Paper", KnowledgeItemKind::File))
                .expect("add");
            let project = store.create_project("Thesis", "").expect("project");
            store.link_item(&project.id, &item.id).expect("link");

            SettingsService::new(kv)
                .set_field("openRouterApiKey", "sk-or-fs")
                .expect("settings");
            project.id
        };

        let kv = Arc::new(FilesystemKeyValueStore::new(dir.path()).expect("reopen"));
        let store = WorkspaceStore::new(kv.clone()).with_event_bus(EventBus::new(4));
        let project = store
            .project(&project_id)
            .expect("read")
            .expect("project exists");
        assert_eq!(project.knowledge_item_ids.len(), 1);
        assert_eq!(store.items().expect("items").len(), 1);

        let settings = SettingsService::new(kv).load();
        assert_eq!(settings.open_router_api_key.as_deref(), Some("sk-or-fs"));
    }
}

mod service_client_tests {
    use mycelial::Error;
    use mycelial::search::{GoogleSearchClient, SearchOptions, WebSearchProvider};
    use secrecy::SecretString;

    #[test]
    fn test_search_with_empty_key_rejects_without_request() {
        let client = GoogleSearchClient::new()
            .with_api_key(SecretString::from(String::new()))
            .with_cx("cx123")
            .with_endpoint("http://127.0.0.1:1");

        let result = client.search("cats", SearchOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
