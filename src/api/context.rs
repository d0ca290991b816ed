use std::sync::Arc;

use crate::store::{Session, Store};


/// The context that is accessible to every resolver in our API.
pub(crate) struct Context {
    pub(crate) store: Session,
}

impl juniper::Context for Context {}

impl Context {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store: Session::new(store),
        }
    }
}
