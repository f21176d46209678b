use crate::completion::GoalLocks;
use crate::storage::JsonFileStore;
use crate::view::ViewController;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: JsonFileStore,
    pub view: Arc<Mutex<ViewController<JsonFileStore>>>,
}

impl AppState {
    pub fn new(store: JsonFileStore) -> Self {
        let view = ViewController::new(store.clone(), GoalLocks::new());
        Self {
            store,
            view: Arc::new(Mutex::new(view)),
        }
    }
}
