//! Keeps the rendered catalog consistent with the store's active selection.

use crate::base::catalog::{ActiveSelection, Catalog};
use crate::ops::store::RemoteStore;
use crate::prelude::*;
use crate::view::{Notice, Presenter};

pub struct SelectionSynchronizer {
    store: Arc<dyn RemoteStore>,
    presenter: Arc<dyn Presenter>,
    /// Last confirmed selection. Written only by `reconcile` and a successful `select`.
    active: Mutex<ActiveSelection>,
}

impl SelectionSynchronizer {
    pub fn new(store: Arc<dyn RemoteStore>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            store,
            presenter,
            active: Mutex::new(ActiveSelection::none()),
        }
    }

    /// Fetches the selection, then the catalog.
    ///
    /// The cached selection is replaced only when both fetches succeed.
    pub async fn reconcile(&self) -> Result<(Catalog, ActiveSelection)> {
        let active = self.store.current_selection().await?;
        let catalog = self.store.catalog().await?;
        if let Some(filename) = active.filename()
            && !catalog.contains(filename)
        {
            debug!(filename, "active selection is not in the catalog");
        }
        *self.active.lock().unwrap() = active.clone();
        Ok((catalog, active))
    }

    /// Reconciles and renders the complete snapshot; on failure nothing is
    /// rendered and the reason is surfaced.
    pub async fn reload(&self) -> Result<()> {
        match self.reconcile().await {
            Ok((catalog, active)) => {
                debug!(entries = catalog.len(), %active, "rendering catalog");
                self.presenter.render(&catalog, &active);
                Ok(())
            }
            Err(err) => {
                warn!("catalog reload failed: {err}");
                self.presenter.notify(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Asks the store to make `filename` active.
    ///
    /// Nothing changes locally until the store confirms; then exactly that
    /// entry is marked active in the view.
    pub async fn select(&self, filename: &str) -> Result<ActiveSelection> {
        match self.store.select(filename).await {
            Ok(()) => {
                let active = ActiveSelection::some(filename);
                *self.active.lock().unwrap() = active.clone();
                info!(filename, "selected image");
                self.presenter.mark_active(filename);
                self.presenter
                    .notify(Notice::success("Image selected for streaming"));
                Ok(active)
            }
            Err(err) => {
                warn!(filename, "selection failed: {err}");
                self.presenter.notify(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// The cached selection used by the render step.
    pub fn active(&self) -> ActiveSelection {
        self.active.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::test_utils::{FakeStore, PresenterEvent, RecordingPresenter};

    fn synchronizer(store: FakeStore) -> (Arc<FakeStore>, Arc<RecordingPresenter>, SelectionSynchronizer) {
        let store = Arc::new(store);
        let presenter = Arc::new(RecordingPresenter::new());
        let sync = SelectionSynchronizer::new(store.clone(), presenter.clone());
        (store, presenter, sync)
    }

    #[tokio::test]
    async fn reconcile_fetches_selection_then_catalog() -> Result<()> {
        let (store, _presenter, sync) =
            synchronizer(FakeStore::new().with_catalog(&["a.png", "b.png"]));

        let (catalog, active) = sync.reconcile().await?;
        assert_eq!(catalog.filenames(), ["a.png", "b.png"]);
        assert!(active.is_none());
        assert_eq!(store.selection_fetches(), 1);
        assert_eq!(store.catalog_fetches(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn select_marks_exactly_one_entry() -> Result<()> {
        let (_store, presenter, sync) =
            synchronizer(FakeStore::new().with_catalog(&["a.png", "b.png"]));
        sync.reload().await?;

        let active = sync.select("b.png").await?;
        assert!(active.is("b.png"));
        assert!(sync.active().is("b.png"));

        let view = presenter.view();
        let marked: Vec<_> = view.active_entries().map(|e| e.filename.as_str()).collect();
        assert_eq!(marked, vec!["b.png"]);
        assert!(!view.entries()[0].active);
        assert!(
            presenter
                .events()
                .contains(&PresenterEvent::MarkActive("b.png".to_owned()))
        );
        assert_eq!(
            presenter.notices(),
            vec![Notice::success("Image selected for streaming")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn successful_select_is_seen_by_next_reconcile() -> Result<()> {
        let (_store, _presenter, sync) = synchronizer(
            FakeStore::new()
                .with_catalog(&["a.png", "b.png"])
                .with_current("a.png"),
        );
        sync.select("b.png").await?;

        let (_, active) = sync.reconcile().await?;
        assert!(active.is("b.png"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_select_leaves_state_untouched() -> Result<()> {
        let (store, presenter, sync) = synchronizer(
            FakeStore::new()
                .with_catalog(&["a.png"])
                .with_current("a.png"),
        );
        sync.reload().await?;
        let before = presenter.view();

        let err = sync.select("ghost.png").await.unwrap_err();
        assert_eq!(err.reason(), "File not found");
        assert_eq!(store.selects(), 1);
        assert!(sync.active().is("a.png"));
        assert_eq!(store.current().as_deref(), Some("a.png"));
        assert_eq!(presenter.view(), before);
        assert!(
            !presenter
                .events()
                .iter()
                .any(|e| matches!(e, PresenterEvent::MarkActive(_)))
        );
        assert_eq!(presenter.notices(), vec![Notice::error("File not found")]);

        let (_, active) = sync.reconcile().await?;
        assert!(active.is("a.png"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_reload_renders_nothing_and_keeps_cache() -> Result<()> {
        let (_store, presenter, sync) = synchronizer(
            FakeStore::new()
                .with_catalog(&["a.png"])
                .with_current("a.png")
                .failing_catalog(),
        );

        assert!(sync.reload().await.is_err());
        assert_eq!(presenter.renders(), 0);
        assert!(sync.active().is_none());
        assert_eq!(
            presenter.notices(),
            vec![Notice::error("Error reading upload directory")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn reload_renders_server_selection() -> Result<()> {
        let (_store, presenter, sync) = synchronizer(
            FakeStore::new()
                .with_catalog(&["a.png", "b.png"])
                .with_current("b.png"),
        );
        sync.reload().await?;

        assert_eq!(
            presenter.events(),
            vec![PresenterEvent::Render {
                catalog: vec!["a.png".to_owned(), "b.png".to_owned()],
                active: Some("b.png".to_owned()),
            }]
        );
        Ok(())
    }
}
