use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::credentials::CredentialStore;
use crate::auth::session::SessionDirectory;
use crate::config::Config;
use crate::content::categories::CategoryIndex;
use crate::content::comments::CommentStore;
use crate::content::posts::PostStore;
use crate::content::reactions::ReactionLedger;
use crate::uploads::ImageStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    pub sessions: SessionDirectory,
    pub posts: PostStore,
    pub comments: CommentStore,
    pub categories: CategoryIndex,
    pub reactions: ReactionLedger,
    pub images: ImageStore,
}

impl AppState {
    /// Wire every store to the same pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let sessions = SessionDirectory::new(db.clone());
        Self {
            credentials: CredentialStore::new(
                db.clone(),
                sessions.clone(),
                config.auth.bcrypt_cost,
            ),
            sessions,
            posts: PostStore::new(db.clone()),
            comments: CommentStore::new(db.clone()),
            categories: CategoryIndex::new(db.clone()),
            reactions: ReactionLedger::new(db),
            images: ImageStore::new(config.uploads_path(), config.storage.max_image_bytes),
            config,
        }
    }
}
