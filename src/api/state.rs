use std::sync::Arc;

use derive_new::new;

use crate::{
    database::Database,
    queries::ViewQueries,
    recorder::ViewRecorder,
    store::SurrealStore,
    time::{DebounceWindow, SystemClock},
};

#[derive(Debug, new)]
pub struct App<S = SurrealStore> {
    pub recorder: Arc<ViewRecorder<S>>,
    pub queries: Arc<ViewQueries<S>>,
}

impl<S> Clone for App<S> {
    fn clone(&self) -> Self {
        Self {
            recorder: self.recorder.clone(),
            queries: self.queries.clone(),
        }
    }
}

impl<S: Clone> App<S> {
    /// Wire the recorder and the queries to one shared store.
    pub fn with_store(store: S, window: DebounceWindow) -> Self {
        let recorder = ViewRecorder::new(store.clone(), SystemClock, window);
        let queries = ViewQueries::new(store);

        tracing::info!(
            minutes = recorder.window().duration().num_minutes(),
            "debouncing repeated views"
        );
        App::new(Arc::new(recorder), Arc::new(queries))
    }
}

pub fn create_app(database: Database, window: DebounceWindow) -> App {
    App::with_store(SurrealStore::new(database), window)
}
