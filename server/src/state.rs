use crate::auth::Authenticator;
use crate::service::PhotoService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub photos: Arc<PhotoService>,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(photos: PhotoService, auth: Authenticator) -> Self {
        AppState {
            photos: Arc::new(photos),
            auth: Arc::new(auth),
        }
    }
}
