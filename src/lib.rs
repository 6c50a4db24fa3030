pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod media;
pub mod navigation;
pub mod playback;
pub mod store;
pub mod watcher;

pub mod state {
    use crate::{
        config::AppConfig,
        content::ContentResolver,
        manifest::ManifestBuilder,
        navigation::NavigationCompiler,
        store::{ContentStore, LocalContentStore},
    };
    use std::sync::Arc;

    /// Services shared for the lifetime of the process
    #[derive(Clone)]
    pub struct AppState {
        pub config: Arc<AppConfig>,
        pub store: Arc<dyn ContentStore>,
        pub content: Arc<ContentResolver>,
        pub navigation: Arc<NavigationCompiler>,
    }

    impl AppState {
        /// Wire every service to a local content tree at `config.content.root`.
        pub fn new(config: AppConfig) -> Self {
            let store: Arc<dyn ContentStore> = Arc::new(LocalContentStore::new(config.content.root_path()));
            Self::with_store(config, store)
        }

        pub fn with_store(config: AppConfig, store: Arc<dyn ContentStore>) -> Self {
            let content = Arc::new(ContentResolver::new(store.clone(), config.content.clone()));
            let navigation = Arc::new(NavigationCompiler::new(
                store.clone(),
                config.content.navigation_file.clone(),
            ));

            Self {
                config: Arc::new(config),
                store,
                content,
                navigation,
            }
        }

        pub fn manifest_builder(&self) -> ManifestBuilder {
            ManifestBuilder::new(self.store.clone(), self.config.content.clone())
        }
    }
}
