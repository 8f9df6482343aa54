use std::sync::Arc;

use crate::config::Config;
use crate::db::Datastore;
use crate::giveaway::admission::EntryAdmission;
use crate::giveaway::manager::GiveawayManager;

// Shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub giveaways: Arc<GiveawayManager>,
    pub admission: Arc<EntryAdmission>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Datastore>) -> Self {
        AppState {
            giveaways: Arc::new(GiveawayManager::new(store.clone(), config.password_length)),
            admission: Arc::new(EntryAdmission::new(store)),
            config: Arc::new(config),
        }
    }
}
