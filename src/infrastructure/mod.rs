pub mod repositories;
pub mod state;
pub mod storage;

pub use repositories::SeaOrmBookRepository;
pub use state::AppState;
pub use storage::DiskCoverStore;
