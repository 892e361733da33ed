mod loading;
mod observer;
mod session;
mod transactions;

pub use loading::LoadContext;
pub(crate) use loading::load_reference;
pub use observer::{ChangeEvent, ChangeKind, ChangeObserver};
pub use session::Session;
